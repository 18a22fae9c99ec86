//! Template engine for rendering documentation pages.

use minijinja::{context, Environment};

/// A navigation item.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NavItem {
    /// Display title
    pub title: String,
    /// Link, relative to the current page; empty for sections
    pub path: String,
    /// Child items
    pub children: Vec<NavItem>,
    /// Whether this is (or contains) the current page
    pub active: bool,
}

/// Link to a neighbouring page.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PageLink {
    pub title: String,
    pub path: String,
}

/// A table of contents entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Context for rendering a page template.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Context {
    /// Page title
    pub title: String,
    /// Site title
    pub site_title: String,
    /// Page description
    pub description: Option<String>,
    /// Rendered content HTML
    pub content: String,
    /// Navigation items
    pub nav: Vec<NavItem>,
    /// Table of contents
    pub toc: Vec<TocEntry>,
    /// Relative path from the page to the site root, ending in `/`
    pub root: String,
    /// Previous page in reading order
    pub prev: Option<PageLink>,
    /// Next page in reading order
    pub next: Option<PageLink>,
    /// Stylesheets to include, relative to the page
    pub styles: Vec<String>,
    /// Live reload script URL (dev server only)
    pub live_reload: Option<String>,
}

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with default templates.
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_template_owned("base.html".to_string(), BASE_TEMPLATE.to_string())
            .expect("Failed to add base template");

        env.add_template_owned("doc.html".to_string(), DOC_TEMPLATE.to_string())
            .expect("Failed to add doc template");

        env.add_template_owned("nav.html".to_string(), NAV_TEMPLATE.to_string())
            .expect("Failed to add nav template");

        Self { env }
    }

    /// Render a page using the specified template.
    pub fn render_page(
        &self,
        template: &str,
        context: &Context,
    ) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(template)?;

        tmpl.render(context! {
            title => &context.title,
            site_title => &context.site_title,
            description => &context.description,
            content => &context.content,
            nav => &context.nav,
            toc => &context.toc,
            root => &context.root,
            prev => &context.prev,
            next => &context.next,
            styles => &context.styles,
            live_reload => &context.live_reload,
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ title }} · {{ site_title }}</title>
  {% if description %}<meta name="description" content="{{ description }}">
  {% endif %}<link rel="stylesheet" href="{{ root|safe }}assets/main.css">
  {% for style in styles %}<link rel="stylesheet" href="{{ style|safe }}">
  {% endfor %}
</head>
<body data-root="{{ root|safe }}">
  <button class="menu-btn" type="button" aria-label="Toggle navigation">☰</button>
  <div class="layout">
    <nav class="sidebar">
      {% include "nav.html" %}
    </nav>
    <main class="main">
      {% block content %}{% endblock %}
    </main>
  </div>
  <script src="{{ root|safe }}assets/main.js"></script>
  {% if live_reload %}<script src="{{ live_reload|safe }}"></script>{% endif %}
</body>
</html>"##;

const DOC_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<article class="doc">
  <div class="content">
    {{ content | safe }}
  </div>
  <nav class="page-links">
    {% if prev %}<a class="prev" href="{{ prev.path|safe }}">« {{ prev.title }}</a>{% endif %}
    {% if next %}<a class="next" href="{{ next.path|safe }}">{{ next.title }} »</a>{% endif %}
  </nav>
</article>

{% if toc %}
<aside class="toc">
  <h2>On this page</h2>
  <ul>
  {% for entry in toc %}
    <li class="toc-level-{{ entry.level }}">
      <a href="#{{ entry.id }}">{{ entry.title }}</a>
    </li>
  {% endfor %}
  </ul>
</aside>
{% endif %}
{% endblock %}"##;

const NAV_TEMPLATE: &str = r##"<div class="nav-header">
  <a href="{{ root|safe }}" class="nav-logo">{{ site_title }}</a>
  <input class="search" type="search" placeholder="Search docs..." aria-label="Search">
  <ul class="search-results"></ul>
</div>
<ul class="nav-list">
{% for item in nav recursive %}
  <li class="nav-item{% if item.active %} active{% endif %}{% if item.children %} section{% endif %}">
    {% if item.path %}<a href="{{ item.path|safe }}">{{ item.title }}</a>{% else %}<span class="nav-section">{{ item.title }}</span>{% endif %}
    {% if item.children %}
    <ul class="nav-children">{{ loop(item.children) }}</ul>
    {% endif %}
  </li>
{% endfor %}
</ul>"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn context(title: &str) -> Context {
        Context {
            title: title.to_string(),
            site_title: "CarrierCapture.jl".to_string(),
            description: None,
            content: String::new(),
            nav: vec![],
            toc: vec![],
            root: "./".to_string(),
            prev: None,
            next: None,
            styles: vec![],
            live_reload: None,
        }
    }

    #[test]
    fn renders_basic_page() {
        let engine = TemplateEngine::new();
        let mut ctx = context("Home");
        ctx.content = "<p>Hello world</p>".to_string();

        let html = engine.render_page("doc.html", &ctx).unwrap();

        assert!(html.contains("<title>Home · CarrierCapture.jl</title>"));
        assert!(html.contains("<p>Hello world</p>"));
        assert!(html.contains(r#"href="./assets/main.css""#));
        assert!(!html.contains("live_reload"));
    }

    #[test]
    fn renders_nested_navigation() {
        let engine = TemplateEngine::new();
        let mut ctx = context("Public");
        ctx.nav = vec![
            NavItem {
                title: "Home".to_string(),
                path: "../index.html".to_string(),
                children: vec![],
                active: false,
            },
            NavItem {
                title: "Library".to_string(),
                path: String::new(),
                children: vec![NavItem {
                    title: "Public".to_string(),
                    path: "public.html".to_string(),
                    children: vec![],
                    active: true,
                }],
                active: true,
            },
        ];

        let html = engine.render_page("doc.html", &ctx).unwrap();

        assert!(html.contains(r#"<a href="../index.html">Home</a>"#));
        assert!(html.contains(r#"<span class="nav-section">Library</span>"#));
        assert!(html.contains(r#"<a href="public.html">Public</a>"#));
        assert!(html.contains("nav-item active"));
    }

    #[test]
    fn renders_page_links_and_reload_script() {
        let engine = TemplateEngine::new();
        let mut ctx = context("Public");
        ctx.prev = Some(PageLink {
            title: "Home".to_string(),
            path: "../".to_string(),
        });
        ctx.live_reload = Some("/__reload.js".to_string());

        let html = engine.render_page("doc.html", &ctx).unwrap();

        assert!(html.contains(r#"<a class="prev" href="../">« Home</a>"#));
        assert!(!html.contains(r#"class="next""#));
        assert!(html.contains(r#"<script src="/__reload.js"></script>"#));
    }

    #[test]
    fn escapes_titles() {
        let engine = TemplateEngine::new();
        let html = engine
            .render_page("doc.html", &context("a<b>"))
            .unwrap();

        assert!(html.contains("a&lt;b&gt;"));
    }
}
