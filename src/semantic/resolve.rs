//! Binding names written in source to fully qualified type names.

use super::{SymbolTable, TypeFragment};

impl<'a> TypeFragment<'a> {
    /// Qualified name that `written` binds to from inside this declaration,
    /// if it names a declared type or `external`.
    ///
    /// Namespace levels are searched innermost first; at each level a type
    /// declared in that namespace wins over alias and using directives.
    pub fn resolve_type_name(
        &self,
        written: &str,
        symbols: &SymbolTable<'_>,
        external: &str,
    ) -> Option<String> {
        let known = |name: &str| name == external || symbols.contains(name);

        if let Some(rest) = written.strip_prefix("global::") {
            return known(rest).then(|| rest.to_string());
        }

        let (head, tail) = match written.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (written, None),
        };

        for level in &self.levels {
            let candidate = qualify(&level.namespace, written);
            if known(&candidate) {
                return Some(candidate);
            }
            if let Some(alias) = level
                .usings
                .iter()
                .find(|u| u.alias.as_deref() == Some(head))
            {
                return Some(match tail {
                    Some(tail) => format!("{}.{tail}", alias.target),
                    None => alias.target.clone(),
                });
            }
            let mut imported = level
                .usings
                .iter()
                .filter(|u| u.alias.is_none() && !u.is_static)
                .map(|u| qualify(&u.target, written))
                .filter(|candidate| known(candidate));
            if let Some(candidate) = imported.next() {
                return Some(candidate);
            }
        }
        None
    }

    /// Whether any attribute on this declaration resolves to `attribute`.
    pub fn has_attribute(&self, attribute: &str, symbols: &SymbolTable<'_>) -> bool {
        self.decl.attributes.iter().any(|written| {
            [written.name.clone(), format!("{}Attribute", written.name)]
                .iter()
                .any(|name| {
                    self.resolve_type_name(name, symbols, attribute).as_deref() == Some(attribute)
                })
        })
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use crate::semantic::Compilation;
    use std::path::PathBuf;

    const ATTRIBUTE: &str = "SharpSenz.SignalsSourceAttribute";

    fn annotated(source: &str) -> bool {
        let compilation =
            Compilation::from_sources(vec![(PathBuf::from("a.cs"), source.to_string())]);
        let symbols = compilation.symbols();
        let ty = symbols
            .types()
            .iter()
            .find(|t| t.name == "Client")
            .expect("Client");
        ty.fragments
            .iter()
            .any(|f| f.has_attribute(ATTRIBUTE, &symbols))
    }

    #[test]
    fn resolves_through_using_directive() {
        assert!(annotated("using SharpSenz;\n[SignalsSource] class Client { }"));
        assert!(annotated("using SharpSenz;\n[SignalsSourceAttribute] class Client { }"));
    }

    #[test]
    fn resolves_qualified_and_global_names() {
        assert!(annotated("[SharpSenz.SignalsSource] class Client { }"));
        assert!(annotated("[global::SharpSenz.SignalsSource] class Client { }"));
    }

    #[test]
    fn resolves_inside_enclosing_namespace() {
        assert!(annotated("namespace SharpSenz.App { [SignalsSource] class Client { } }"));
    }

    #[test]
    fn resolves_aliases() {
        assert!(annotated("using Sig = SharpSenz.SignalsSourceAttribute;\n[Sig] class Client { }"));
        assert!(annotated("using S = SharpSenz;\n[S.SignalsSource] class Client { }"));
    }

    #[test]
    fn ignores_same_named_unrelated_attributes() {
        assert!(!annotated("[SignalsSource] class Client { }"));
        assert!(!annotated(
            "using SharpSenz;\nnamespace App { class SignalsSourceAttribute { } [SignalsSource] class Client { } }"
        ));
        assert!(!annotated("using Other;\n[SignalsSource] class Client { }"));
    }
}
