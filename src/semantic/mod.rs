//! Declared types across a set of syntax trees.
//!
//! A [`Compilation`] owns parsed documents. [`Compilation::symbols`] builds a
//! [`SymbolTable`] that merges every `partial` declaration of a type into
//! one [`NamedType`] and remembers, for each fragment, the namespace and
//! using-directive scopes needed to resolve names written inside it.

mod display;
mod resolve;
mod scope;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::syntax::ast::{
    FieldDecl, MethodDecl, NamespaceMember, PropertyDecl, TypeDecl, TypeKind, TypeSyntax,
    UsingDirective,
};
use crate::syntax::SyntaxTree;

pub use display::display_type;
pub use scope::MethodScope;

#[derive(Debug, Clone, Default)]
pub struct Compilation {
    documents: Vec<Arc<SyntaxTree>>,
}

impl Compilation {
    pub fn new(documents: impl IntoIterator<Item = Arc<SyntaxTree>>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    /// Parses every source in parallel, keeping input order.
    pub fn from_sources(sources: Vec<(PathBuf, String)>) -> Self {
        let documents = sources
            .into_par_iter()
            .map(|(path, text)| Arc::new(SyntaxTree::parse(path, text)))
            .collect::<Vec<_>>();
        Self { documents }
    }

    pub fn documents(&self) -> &[Arc<SyntaxTree>] {
        &self.documents
    }

    pub fn document(&self, index: usize) -> Option<&SyntaxTree> {
        self.documents.get(index).map(Arc::as_ref)
    }

    pub fn symbols(&self) -> SymbolTable<'_> {
        SymbolTable::build(&self.documents)
    }
}

/// One namespace level visible from a declaration, with the using
/// directives declared at that level.
#[derive(Debug, Clone)]
pub struct ScopeLevel<'a> {
    pub namespace: String,
    pub usings: Vec<&'a UsingDirective>,
}

/// One `partial` declaration of a type.
#[derive(Debug, Clone)]
pub struct TypeFragment<'a> {
    pub document: usize,
    pub tree: &'a SyntaxTree,
    pub decl: &'a TypeDecl,
    pub namespace: String,
    /// Enclosing type declarations, outermost first.
    pub containing: Vec<&'a TypeDecl>,
    /// Innermost level first; the last entry is the global namespace.
    pub levels: Vec<ScopeLevel<'a>>,
}

impl<'a> TypeFragment<'a> {
    pub fn path(&self) -> &'a std::path::Path {
        self.tree.path()
    }
}

#[derive(Debug, Clone)]
pub struct NamedType<'a> {
    pub name: String,
    pub namespace: String,
    /// `Namespace.Outer.Name`, without type parameters.
    pub qualified_name: String,
    pub arity: usize,
    pub fragments: Vec<TypeFragment<'a>>,
}

impl<'a> NamedType<'a> {
    pub fn kind(&self) -> TypeKind {
        self.fragments
            .first()
            .map(|f| f.decl.kind)
            .unwrap_or(TypeKind::Class)
    }

    /// True when every declaration carries `partial`.
    pub fn is_partial(&self) -> bool {
        self.fragments.iter().all(|f| f.decl.is_partial())
    }

    pub fn containing(&self) -> &[&'a TypeDecl] {
        self.fragments
            .first()
            .map(|f| f.containing.as_slice())
            .unwrap_or(&[])
    }

    pub fn type_parameters(&self) -> Option<&str> {
        self.fragments
            .iter()
            .find_map(|f| f.decl.type_parameters.as_deref())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&TypeFragment<'a>, &'a FieldDecl)> + '_ {
        self.fragments
            .iter()
            .flat_map(|f| f.decl.fields().map(move |field| (f, field)))
    }

    pub fn properties(&self) -> impl Iterator<Item = (&TypeFragment<'a>, &'a PropertyDecl)> + '_ {
        self.fragments
            .iter()
            .flat_map(|f| f.decl.properties().map(move |p| (f, p)))
    }

    /// Methods declared directly on the type, in fragment order.
    pub fn methods(&self) -> impl Iterator<Item = (&TypeFragment<'a>, &'a MethodDecl)> + '_ {
        self.fragments
            .iter()
            .flat_map(|f| f.decl.methods().map(move |m| (f, m)))
    }

    /// First nested type (at any depth, any fragment) with the given name.
    pub fn nested_type(&self, name: &str) -> Option<(&TypeFragment<'a>, &'a TypeDecl)> {
        self.fragments.iter().find_map(|f| {
            f.decl
                .descendant_types()
                .into_iter()
                .find(|ty| ty.name == name)
                .map(|ty| (f, ty))
        })
    }

    /// Declared type of a field or property.
    pub fn member_type(&self, name: &str) -> Option<&'a TypeSyntax> {
        let field = self.fields().find_map(|(_, field)| {
            field
                .declarators
                .iter()
                .any(|d| d.name == name)
                .then_some(&field.ty)
        });
        field.or_else(|| {
            self.properties()
                .find(|(_, p)| p.name == name)
                .map(|(_, p)| &p.ty)
        })
    }
}

/// All declared types of a compilation, in document and declaration order.
#[derive(Debug, Default)]
pub struct SymbolTable<'a> {
    types: Vec<NamedType<'a>>,
    index: HashMap<(String, usize), usize>,
    names: HashSet<String>,
}

impl<'a> SymbolTable<'a> {
    fn build(documents: &'a [Arc<SyntaxTree>]) -> Self {
        let mut table = SymbolTable::default();
        for (document, tree) in documents.iter().enumerate() {
            let global = ScopeLevel {
                namespace: String::new(),
                usings: tree.root().usings.iter().collect(),
            };
            let mut collector = Collector {
                table: &mut table,
                document,
                tree,
            };
            collector.members(&tree.root().members, "", vec![global]);
        }
        table
    }

    pub fn types(&self) -> &[NamedType<'a>] {
        &self.types
    }

    pub fn get(&self, qualified_name: &str, arity: usize) -> Option<&NamedType<'a>> {
        self.index
            .get(&(qualified_name.to_string(), arity))
            .map(|&idx| &self.types[idx])
    }

    /// Whether any type with this qualified name is declared.
    pub fn contains(&self, qualified_name: &str) -> bool {
        self.names.contains(qualified_name)
    }

    pub fn by_simple_name<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s NamedType<'a>> {
        self.types.iter().filter(move |ty| ty.name == name)
    }

    fn insert(&mut self, fragment: TypeFragment<'a>) {
        let decl = fragment.decl;
        let arity = decl.arity();
        let mut qualified_name = fragment.namespace.clone();
        for outer in fragment.containing.iter().map(|t| t.name.as_str()).chain([decl.name.as_str()]) {
            if !qualified_name.is_empty() {
                qualified_name.push('.');
            }
            qualified_name.push_str(outer);
        }
        let key = (qualified_name.clone(), arity);
        match self.index.get(&key) {
            Some(&idx) => self.types[idx].fragments.push(fragment),
            None => {
                self.index.insert(key, self.types.len());
                self.names.insert(qualified_name.clone());
                self.types.push(NamedType {
                    name: decl.name.clone(),
                    namespace: fragment.namespace.clone(),
                    qualified_name,
                    arity,
                    fragments: vec![fragment],
                });
            }
        }
    }
}

struct Collector<'t, 'a> {
    table: &'t mut SymbolTable<'a>,
    document: usize,
    tree: &'a SyntaxTree,
}

impl<'t, 'a> Collector<'t, 'a> {
    fn members(&mut self, members: &'a [NamespaceMember], namespace: &str, levels: Vec<ScopeLevel<'a>>) {
        for member in members {
            match member {
                NamespaceMember::Namespace(ns) => {
                    let full = if namespace.is_empty() {
                        ns.name.clone()
                    } else {
                        format!("{namespace}.{}", ns.name)
                    };
                    let mut inner = Vec::new();
                    // `namespace A.B` opens `A` and then `A.B`.
                    let segments: Vec<&str> = full.split('.').collect();
                    for depth in (1..=segments.len()).rev() {
                        let name = segments[..depth].join(".");
                        if !namespace.is_empty() && name.len() <= namespace.len() {
                            break;
                        }
                        let usings = if depth == segments.len() {
                            ns.usings.iter().collect()
                        } else {
                            Vec::new()
                        };
                        inner.push(ScopeLevel { namespace: name, usings });
                    }
                    inner.extend(levels.iter().cloned());
                    self.members(&ns.members, &full, inner);
                }
                NamespaceMember::Type(ty) => self.declare(ty, namespace, &levels, Vec::new()),
            }
        }
    }

    fn declare(
        &mut self,
        decl: &'a TypeDecl,
        namespace: &str,
        levels: &[ScopeLevel<'a>],
        containing: Vec<&'a TypeDecl>,
    ) {
        self.table.insert(TypeFragment {
            document: self.document,
            tree: self.tree,
            decl,
            namespace: namespace.to_string(),
            containing: containing.clone(),
            levels: levels.to_vec(),
        });
        let mut inner = containing;
        inner.push(decl);
        for nested in decl.nested_types() {
            self.declare(nested, namespace, levels, inner.clone());
        }
    }
}
