//! Entry-point discovery: which binding in the source is the component.

use std::sync::{Arc, LazyLock};

use compbridge_config::EntryMode;
use regex::Regex;

static FIRST_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:const|function|class)\s+([A-Za-z_$][\w$]*)").expect("valid regex")
});

static DEFAULT_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bexport\s+default\s+(?:(?:function|class)\s+)?([A-Za-z_$][\w$]*)")
        .expect("valid regex")
});

/// Picks the entry component's name out of free-form source.
pub trait EntryResolver: Send + Sync {
    /// Name of the entry binding, or `None` when nothing matches.
    fn resolve(&self, source: &str) -> Option<String>;

    /// Short name used in logs and config.
    fn name(&self) -> &'static str;
}

/// The first `const`, `function` or `class` declaration wins.
///
/// A heuristic: a helper declared above the component is picked instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstDeclaration;

impl EntryResolver for FirstDeclaration {
    fn resolve(&self, source: &str) -> Option<String> {
        FIRST_DECLARATION
            .captures(source)
            .map(|caps| caps[1].to_string())
    }

    fn name(&self) -> &'static str {
        "first-declaration"
    }
}

/// The identifier named by `export default <name>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExport;

impl EntryResolver for DefaultExport {
    fn resolve(&self, source: &str) -> Option<String> {
        DEFAULT_EXPORT
            .captures(source)
            .map(|caps| caps[1].to_string())
    }

    fn name(&self) -> &'static str {
        "default-export"
    }
}

/// Resolver for a configured entry mode.
pub fn resolver_for(mode: EntryMode) -> Arc<dyn EntryResolver> {
    match mode {
        EntryMode::FirstDeclaration => Arc::new(FirstDeclaration),
        EntryMode::DefaultExport => Arc::new(DefaultExport),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_declaration_forms() {
        let r = FirstDeclaration;
        assert_eq!(r.resolve("const Card = () => <div/>;").as_deref(), Some("Card"));
        assert_eq!(r.resolve("function Badge(props) {}").as_deref(), Some("Badge"));
        assert_eq!(
            r.resolve("class Clock extends React.Component {}").as_deref(),
            Some("Clock")
        );
        assert_eq!(r.resolve("const $x = 1").as_deref(), Some("$x"));
    }

    #[test]
    fn test_first_declaration_picks_earliest() {
        let src = "const helper = (n) => n * 2;\nconst Widget = () => <b/>;";
        assert_eq!(FirstDeclaration.resolve(src).as_deref(), Some("helper"));
    }

    #[test]
    fn test_first_declaration_misses() {
        assert_eq!(FirstDeclaration.resolve("cosnt X = () => <div/>"), None);
        assert_eq!(FirstDeclaration.resolve("let X = 1"), None);
        assert_eq!(FirstDeclaration.resolve("constant = 1"), None);
        assert_eq!(FirstDeclaration.resolve(""), None);
    }

    #[test]
    fn test_default_export() {
        let src = "const helper = 1;\nconst Widget = () => <b/>;\nexport default Widget;";
        assert_eq!(DefaultExport.resolve(src).as_deref(), Some("Widget"));
        assert_eq!(
            DefaultExport.resolve("export default function Page() {}").as_deref(),
            Some("Page")
        );
        assert_eq!(DefaultExport.resolve("const Widget = 1;"), None);
    }

    #[test]
    fn test_resolver_for_mode() {
        assert_eq!(resolver_for(EntryMode::FirstDeclaration).name(), "first-declaration");
        assert_eq!(resolver_for(EntryMode::DefaultExport).name(), "default-export");
    }
}
