// ABOUTME: Framework-specific source normalization and transport encoding
// ABOUTME: Best-effort textual rewrites that fit submitted components into the template app

use crate::error::ValidationError;
use crate::framework::Framework;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;

pub const CANONICAL_SELECTOR: &str = "app-root";
pub const CANONICAL_CLASS_NAME: &str = "AppComponent";
const COMPONENT_IMPORT: &str = "import { Component } from '@angular/core';\n";

// Each rewrite is a single pattern substitution, not a parser: a source that
// does not match is left untouched and the build tooling reports the error.
static COMPONENT_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s*\{[^}]*\bComponent\b[^}]*\}\s*from\s*['"]@angular/core['"]"#)
        .expect("valid component import regex")
});
static SELECTOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"selector\s*:\s*['"`][^'"`]*['"`]"#).expect("valid selector regex")
});
static CLASS_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+class\s+[A-Za-z_$][A-Za-z0-9_$]*").expect("valid class name regex")
});
static STANDALONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bstandalone\s*:").expect("valid standalone regex"));
static COMPONENT_DECORATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@Component\s*\(\s*\{").expect("valid decorator regex"));
static EXTERNAL_REFERENCE_RES: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r#"\s*templateUrl\s*:\s*['"`][^'"`]*['"`]\s*,?"#).expect("valid templateUrl regex"),
        Regex::new(r#"\s*styleUrl\s*:\s*['"`][^'"`]*['"`]\s*,?"#).expect("valid styleUrl regex"),
        Regex::new(r"\s*styleUrls\s*:\s*\[[^\]]*\]\s*,?").expect("valid styleUrls regex"),
    ]
});

/// Source ready to be written into a sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSource {
    pub text: String,
    /// Base64 of `text`; the only form ever embedded in a shell command
    pub encoded: String,
}

impl NormalizedSource {
    fn new(text: String) -> Self {
        let encoded = STANDARD.encode(text.as_bytes());
        Self { text, encoded }
    }
}

/// Reject blank or oversized source before any sandbox work starts.
pub fn validate_source(source: &str, max_bytes: usize) -> Result<(), ValidationError> {
    if source.trim().is_empty() {
        return Err(ValidationError::MissingSource);
    }
    if source.len() > max_bytes {
        return Err(ValidationError::SourceTooLarge {
            size: source.len(),
            limit: max_bytes,
        });
    }
    Ok(())
}

pub fn normalize(framework: Framework, source: &str) -> NormalizedSource {
    let text = match framework {
        Framework::Angular => normalize_angular(source),
        Framework::React | Framework::Vue => source.to_string(),
    };
    NormalizedSource::new(text)
}

/// Rewrite an Angular component so it builds as the template's root component.
///
/// Applied in a fixed order; every step is idempotent.
pub fn normalize_angular(source: &str) -> String {
    let mut text = if COMPONENT_IMPORT_RE.is_match(source) {
        source.to_string()
    } else {
        format!("{}{}", COMPONENT_IMPORT, source)
    };

    text = SELECTOR_RE
        .replace(&text, format!("selector: '{}'", CANONICAL_SELECTOR).as_str())
        .into_owned();

    text = CLASS_NAME_RE
        .replace(&text, format!("export class {}", CANONICAL_CLASS_NAME).as_str())
        .into_owned();

    if !STANDALONE_RE.is_match(&text) {
        text = COMPONENT_DECORATOR_RE
            .replace(&text, "@Component({\n  standalone: true,")
            .into_owned();
    }

    for re in EXTERNAL_REFERENCE_RES.iter() {
        text = re.replace_all(&text, "").into_owned();
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EXTERNAL_COMPONENT: &str = r#"import { Component, Input } from '@angular/core';

@Component({
  selector: 'my-widget',
  templateUrl: './widget.component.html',
  styleUrls: ['./widget.component.css', './theme.css'],
})
export class WidgetComponent {
  @Input() label = 'hi';
}
"#;

    #[test]
    fn test_angular_rewrites_selector_class_and_standalone() {
        let out = normalize_angular(EXTERNAL_COMPONENT);
        assert!(out.contains("selector: 'app-root'"));
        assert!(out.contains("export class AppComponent"));
        assert!(out.contains("standalone: true,"));
        assert!(!out.contains("my-widget"));
        assert!(!out.contains("WidgetComponent"));
    }

    #[test]
    fn test_angular_strips_external_references() {
        let out = normalize_angular(EXTERNAL_COMPONENT);
        assert!(!out.contains("templateUrl"));
        assert!(!out.contains("styleUrls"));
        assert!(!out.contains("widget.component.css"));

        let single = "@Component({ selector: 'x', styleUrl: './a.css', template: '<p></p>' })\nexport class A {}";
        let out = normalize_angular(single);
        assert!(!out.contains("styleUrl"));
        assert!(out.contains("template: '<p></p>'"));
    }

    #[test]
    fn test_angular_adds_missing_import() {
        let source = "@Component({ selector: 'x', template: '' })\nexport class X {}";
        let out = normalize_angular(source);
        assert!(out.starts_with(COMPONENT_IMPORT));
    }

    #[test]
    fn test_angular_keeps_existing_import_and_standalone() {
        let source = "import { Component } from '@angular/core';\n@Component({ standalone: true, selector: 'app-root', template: '' })\nexport class AppComponent {}\n";
        assert_eq!(normalize_angular(source), source);
    }

    #[test]
    fn test_angular_normalization_is_idempotent() {
        let samples = [
            EXTERNAL_COMPONENT,
            "export class Lonely {}",
            "@Component({template: `<b>hi</b>`})\nexport class Foo {}",
            "not typescript at all $(rm -rf /) 'quoted' \"double\"",
            "",
        ];
        for sample in samples {
            let once = normalize_angular(sample);
            let twice = normalize_angular(&once);
            assert_eq!(twice, once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_non_matching_source_only_gains_import() {
        let source = "const x = 1;";
        assert_eq!(normalize_angular(source), format!("{}{}", COMPONENT_IMPORT, source));
    }

    #[test]
    fn test_react_and_vue_pass_through() {
        let source = "export default function App() { return <div>'\"`$(x)`</div> }";
        assert_eq!(normalize(Framework::React, source).text, source);
        assert_eq!(normalize(Framework::Vue, source).text, source);
    }

    #[test]
    fn test_encoded_form_is_shell_safe_and_reversible() {
        let source = "echo '$(whoami)'; \"quoted\"\nnext `line`";
        let normalized = normalize(Framework::React, source);
        assert!(normalized
            .encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
        let decoded = STANDARD.decode(&normalized.encoded).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), source);
    }

    #[test]
    fn test_validate_source() {
        assert_eq!(validate_source("   \n", 10), Err(ValidationError::MissingSource));
        assert_eq!(
            validate_source("0123456789x", 10),
            Err(ValidationError::SourceTooLarge { size: 11, limit: 10 })
        );
        assert!(validate_source("ok", 10).is_ok());
    }
}
