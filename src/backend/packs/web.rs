//! Web language pack: browser JavaScript plus an HTML/CSS scaffold.
//!
//! Emission reuses the JavaScript statement emitter; the `print` helper
//! additionally appends to a DOM output element. Scaffolding produces the
//! three-file bundle `index.html`, `styles.css`, `app.js`.

use std::collections::BTreeMap;

use icl_core::features;

use crate::backend::lower::LoweredModule;
use crate::backend::packs::js::JsEmitter;
use crate::backend::packs::{
    BlockModel, EmissionContext, LanguagePack, OutputBundle, PackManifest, Scaffolding, Stability,
    StatementTermination,
};

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>ICL Web Output</title>
    <link rel="stylesheet" href="styles.css" />
  </head>
  <body>
    <main class="container">
      <h1>ICL Web Output</h1>
      <pre id="icl-output"></pre>
    </main>
    <script type="module" src="app.js"></script>
  </body>
</html>
"#;

const STYLES_CSS: &str = r#"body {
  margin: 0;
  padding: 2rem;
  font-family: "JetBrains Mono", "Fira Code", monospace;
  background: radial-gradient(circle at top left, #f3f4f6, #dbeafe 50%, #bfdbfe);
  color: #0f172a;
}

.container {
  max-width: 64rem;
  margin: 0 auto;
  padding: 1.5rem;
  border: 1px solid #94a3b8;
  border-radius: 0.75rem;
  background: rgba(255, 255, 255, 0.92);
}

#icl-output {
  min-height: 10rem;
  padding: 1rem;
  border-radius: 0.5rem;
  background: #0f172a;
  color: #e2e8f0;
  overflow: auto;
}
"#;

const PRINT_HELPER: &str = concat!(
    "const __icl_output = document.getElementById('icl-output');\n",
    "function print(value) {\n",
    "  if (__icl_output) {\n",
    "    __icl_output.textContent += String(value) + '\\n';\n",
    "  }\n",
    "  console.log(value);\n",
    "}\n\n",
);

pub struct WebPack {
    manifest: PackManifest,
}

impl WebPack {
    pub fn new() -> Self {
        Self {
            manifest: PackManifest {
                pack_id: "icl.web.browser".to_string(),
                version: "2.0.0".to_string(),
                target: "web".to_string(),
                aliases: vec!["browser".to_string(), "webapp".to_string()],
                stability: Stability::Stable,
                file_extension: "js".to_string(),
                block_model: BlockModel::Braces,
                statement_termination: StatementTermination::Semicolon,
                type_strategy: "gradual_symbolic_runtime".to_string(),
                runtime_helpers: vec!["print".to_string()],
                scaffolding: Scaffolding {
                    primary: "app.js".to_string(),
                    additional: vec!["index.html".to_string(), "styles.css".to_string()],
                    entrypoint: Some("index.html".to_string()),
                },
                feature_coverage: features::full_coverage(),
            },
        }
    }
}

impl Default for WebPack {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePack for WebPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _context: &EmissionContext) -> String {
        let code = JsEmitter::new().emit_module(lowered);
        if lowered.required_helpers.iter().any(|h| h == "print") {
            format!("{PRINT_HELPER}{code}")
        } else {
            code
        }
    }

    fn scaffold(&self, emitted: &str, _context: &EmissionContext) -> OutputBundle {
        let mut files = BTreeMap::new();
        files.insert("index.html".to_string(), INDEX_HTML.to_string());
        files.insert("styles.css".to_string(), STYLES_CSS.to_string());
        files.insert("app.js".to_string(), emitted.to_string());
        OutputBundle {
            primary_path: "app.js".to_string(),
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::lower_for;

    #[test]
    fn print_helper_targets_dom_and_console() {
        let pack = WebPack::new();
        let lowered = lower_for("@print(1);", pack.manifest());
        let code = pack.emit(&lowered, &EmissionContext::for_target("web"));
        assert!(code.contains("__icl_output"));
        assert!(code.contains("console.log(value);"));
        assert!(code.ends_with("print(1);\n"));
    }

    #[test]
    fn scaffold_produces_three_file_bundle() {
        let pack = WebPack::new();
        let lowered = lower_for("@print(1);", pack.manifest());
        let code = pack.emit(&lowered, &EmissionContext::for_target("web"));
        let bundle = pack.scaffold(&code, &EmissionContext::for_target("web"));
        assert_eq!(bundle.primary_path, "app.js");
        assert!(bundle.files.contains_key("index.html"));
        assert!(bundle.files.contains_key("styles.css"));
        assert!(bundle.files.contains_key("app.js"));
        assert!(bundle.files["index.html"].contains("icl-output"));
    }

    #[test]
    fn no_helper_without_print() {
        let pack = WebPack::new();
        let lowered = lower_for("x := 1;", pack.manifest());
        let code = pack.emit(&lowered, &EmissionContext::for_target("web"));
        assert_eq!(code, "let x = 1;\n");
    }
}
