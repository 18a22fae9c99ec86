//! Stylesheet and runtime script of the documentation theme.

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// The theme stylesheet.
    pub fn generate_css() -> String {
        THEME_CSS.to_string()
    }

    /// The runtime script: menu toggle, copy buttons and search.
    pub fn generate_js() -> String {
        THEME_JS.to_string()
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }
}

const THEME_CSS: &str = r#"/* CarrierCapture.jl documentation theme */

:root {
  --sidebar-width: 260px;
  --toc-width: 200px;
  --content-max-width: 820px;
  --bg: #ffffff;
  --fg: #222831;
  --muted: #f5f6f8;
  --muted-fg: #5c6370;
  --border: #e1e4e8;
  --accent: #4063d8;
  --accent-fg: #ffffff;
  --code-bg: #f6f8fa;
  --warning: #f0ad4e;
  --radius: 4px;
  --font-sans: "Lato", system-ui, -apple-system, sans-serif;
  --font-mono: "JuliaMono", "Roboto Mono", ui-monospace, monospace;
}

@media (prefers-color-scheme: dark) {
  :root {
    --bg: #1f2428;
    --fg: #e6e6e6;
    --muted: #282f34;
    --muted-fg: #9aa3ad;
    --border: #3b434a;
    --accent: #6b8cff;
    --code-bg: #2a3137;
  }
}

* {
  box-sizing: border-box;
  margin: 0;
  padding: 0;
}

body {
  font-family: var(--font-sans);
  background: var(--bg);
  color: var(--fg);
  line-height: 1.6;
}

.layout {
  display: grid;
  grid-template-columns: var(--sidebar-width) 1fr;
  min-height: 100vh;
}

.sidebar {
  background: var(--muted);
  border-right: 1px solid var(--border);
  padding: 1.25rem;
  position: sticky;
  top: 0;
  height: 100vh;
  overflow-y: auto;
}

.nav-header {
  margin-bottom: 1.25rem;
}

.nav-logo {
  display: block;
  font-weight: 700;
  font-size: 1.2rem;
  color: var(--fg);
  text-decoration: none;
  margin-bottom: 0.75rem;
}

.search {
  width: 100%;
  padding: 0.4rem 0.6rem;
  border: 1px solid var(--border);
  border-radius: var(--radius);
  background: var(--bg);
  color: var(--fg);
}

.search-results {
  list-style: none;
  margin-top: 0.5rem;
}

.search-results a {
  display: block;
  padding: 0.25rem 0;
  color: var(--accent);
  text-decoration: none;
  font-size: 0.9rem;
}

.nav-list,
.nav-children {
  list-style: none;
}

.nav-children {
  margin-left: 0.75rem;
}

.nav-item a,
.nav-section {
  display: block;
  padding: 0.3rem 0.6rem;
  color: var(--muted-fg);
  text-decoration: none;
  border-radius: var(--radius);
}

.nav-section {
  font-weight: 700;
  text-transform: uppercase;
  font-size: 0.8rem;
  letter-spacing: 0.04em;
}

.nav-item a:hover {
  color: var(--fg);
}

.nav-item.active > a {
  background: var(--accent);
  color: var(--accent-fg);
}

.main {
  display: grid;
  grid-template-columns: 1fr var(--toc-width);
  gap: 2rem;
  padding: 2rem;
  max-width: calc(var(--content-max-width) + var(--toc-width) + 4rem);
}

.doc {
  max-width: var(--content-max-width);
  min-width: 0;
}

.content h1 {
  font-size: 2.2rem;
  margin-bottom: 1.25rem;
}

.content h2 {
  font-size: 1.5rem;
  margin: 2rem 0 1rem;
  padding-bottom: 0.4rem;
  border-bottom: 1px solid var(--border);
}

.content h3 {
  font-size: 1.2rem;
  margin: 1.5rem 0 0.75rem;
}

.content p,
.content ul,
.content ol,
.content table {
  margin-bottom: 1rem;
}

.content ul,
.content ol {
  padding-left: 1.5rem;
}

.content a {
  color: var(--accent);
}

.content table {
  border-collapse: collapse;
}

.content th,
.content td {
  border: 1px solid var(--border);
  padding: 0.3rem 0.6rem;
}

.content pre {
  background: var(--code-bg);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 0.9rem;
  overflow-x: auto;
  font-family: var(--font-mono);
  font-size: 0.85rem;
  margin-bottom: 1rem;
  position: relative;
}

.content code {
  font-family: var(--font-mono);
  font-size: 0.9em;
  background: var(--code-bg);
  padding: 0.1rem 0.3rem;
  border-radius: 3px;
}

.content pre code {
  background: none;
  padding: 0;
}

.docstring {
  border: 1px solid var(--border);
  border-radius: var(--radius);
  margin-bottom: 1.5rem;
}

.docstring > header {
  background: var(--muted);
  border-bottom: 1px solid var(--border);
  padding: 0.5rem 0.9rem;
}

.docstring > header code {
  font-weight: 700;
  background: none;
}

.docstring-binding {
  text-decoration: none;
}

.docstring-category {
  color: var(--muted-fg);
  font-style: italic;
  font-size: 0.9rem;
}

.docstring > :not(header) {
  margin-left: 0.9rem;
  margin-right: 0.9rem;
}

.docstring > :nth-child(2) {
  margin-top: 0.9rem;
}

.admonition.warning {
  border-left: 4px solid var(--warning);
  background: var(--muted);
  padding: 0.6rem 0.9rem;
  margin-bottom: 1rem;
}

.page-links {
  display: flex;
  justify-content: space-between;
  border-top: 1px solid var(--border);
  margin-top: 2.5rem;
  padding-top: 1rem;
}

.page-links a {
  color: var(--accent);
  text-decoration: none;
}

.page-links .next {
  margin-left: auto;
}

.copy-btn {
  position: absolute;
  top: 0.4rem;
  right: 0.4rem;
  padding: 0.15rem 0.6rem;
  font-size: 0.75rem;
  background: var(--bg);
  color: var(--muted-fg);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  cursor: pointer;
}

.toc {
  position: sticky;
  top: 2rem;
  align-self: start;
}

.toc h2 {
  font-size: 0.75rem;
  text-transform: uppercase;
  letter-spacing: 0.05em;
  color: var(--muted-fg);
  margin-bottom: 0.75rem;
}

.toc ul {
  list-style: none;
}

.toc a {
  font-size: 0.85rem;
  color: var(--muted-fg);
  text-decoration: none;
}

.toc-level-3 {
  padding-left: 1rem;
}

.menu-btn {
  display: none;
  position: fixed;
  top: 1rem;
  left: 1rem;
  z-index: 100;
  padding: 0.4rem 0.6rem;
  background: var(--accent);
  color: var(--accent-fg);
  border: none;
  border-radius: var(--radius);
  cursor: pointer;
}

@media (max-width: 1024px) {
  .layout,
  .main {
    grid-template-columns: 1fr;
  }

  .sidebar {
    position: fixed;
    left: -100%;
    z-index: 50;
    width: var(--sidebar-width);
    transition: left 0.3s;
  }

  .sidebar.open {
    left: 0;
  }

  .toc {
    display: none;
  }

  .menu-btn {
    display: block;
  }
}
"#;

const THEME_JS: &str = r#"// CarrierCapture.jl documentation runtime
(function() {
  'use strict';

  const root = document.body.dataset.root || './';

  const menuBtn = document.querySelector('.menu-btn');
  const sidebar = document.querySelector('.sidebar');
  if (menuBtn && sidebar) {
    menuBtn.addEventListener('click', () => sidebar.classList.toggle('open'));
  }

  document.querySelectorAll('.content pre').forEach(pre => {
    if (pre.querySelector('.copy-btn')) return;

    const btn = document.createElement('button');
    btn.className = 'copy-btn';
    btn.type = 'button';
    btn.textContent = 'Copy';
    btn.addEventListener('click', async () => {
      const code = pre.querySelector('code');
      try {
        await navigator.clipboard.writeText((code || pre).textContent || '');
        btn.textContent = 'Copied';
      } catch (err) {
        btn.textContent = 'Error';
      }
      setTimeout(() => { btn.textContent = 'Copy'; }, 2000);
    });
    pre.appendChild(btn);
  });

  const input = document.querySelector('.search');
  const results = document.querySelector('.search-results');
  if (!input || !results) return;

  let index = null;
  const load = () => {
    if (index) return Promise.resolve(index);
    return fetch(root + 'search-index.json')
      .then(r => r.json())
      .then(data => (index = data))
      .catch(() => (index = []));
  };

  input.addEventListener('focus', load);
  input.addEventListener('input', () => {
    const query = input.value.trim().toLowerCase();
    results.innerHTML = '';
    if (query.length < 2) return;

    load().then(pages => {
      pages
        .filter(p => (p.title + ' ' + p.description + ' ' + p.content).toLowerCase().includes(query))
        .slice(0, 10)
        .forEach(p => {
          const li = document.createElement('li');
          const a = document.createElement('a');
          a.href = root + p.url;
          a.textContent = p.title;
          li.appendChild(a);
          results.appendChild(li);
        });
    });
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_styles_docstrings() {
        let css = AssetPipeline::generate_css();
        assert!(css.contains(":root"));
        assert!(css.contains(".docstring"));
        assert!(css.contains(".nav-section"));
    }

    #[test]
    fn script_searches_relative_to_root() {
        let js = AssetPipeline::generate_js();
        assert!(js.contains("dataset.root"));
        assert!(js.contains("search-index.json"));
        assert!(js.contains("clipboard"));
    }

    #[test]
    fn minifies_theme() {
        let css = AssetPipeline::generate_css();
        let minified = AssetPipeline::minify_css(&css).unwrap();

        assert!(minified.len() < css.len());
        assert!(!minified.contains("/* CarrierCapture"));
        assert!(minified.contains(".docstring"));
    }
}
