//! Syntax nodes.
//!
//! Nodes never own text: they point into the token stream of their
//! [`super::SyntaxTree`] through [`TokenId`]s and [`TokenRange`]s, so a node
//! can always be mapped back to exact source bytes.

use super::token::TokenId;

/// Half-open range of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenRange {
    pub start: TokenId,
    pub end: TokenId,
}

impl TokenRange {
    pub fn new(start: TokenId, end: TokenId) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.start <= id && id < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Index of the last token in the range.
    pub fn last(&self) -> Option<TokenId> {
        (!self.is_empty()).then(|| self.end - 1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub usings: Vec<UsingDirective>,
    pub members: Vec<NamespaceMember>,
}

#[derive(Debug, Clone)]
pub enum NamespaceMember {
    Namespace(NamespaceDecl),
    Type(TypeDecl),
}

#[derive(Debug, Clone)]
pub struct UsingDirective {
    pub alias: Option<String>,
    pub target: String,
    pub is_static: bool,
    pub range: TokenRange,
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: String,
    pub file_scoped: bool,
    pub usings: Vec<UsingDirective>,
    pub members: Vec<NamespaceMember>,
    pub range: TokenRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Record,
    RecordStruct,
}

impl TypeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Record => "record",
            TypeKind::RecordStruct => "record struct",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    /// Name as written, e.g. `SignalsSource` or `global::SharpSenz.SignalsSource`.
    pub name: String,
    pub range: TokenRange,
}

#[derive(Debug, Clone)]
pub struct Modifier {
    pub text: String,
    pub token: TokenId,
}

/// A type reference with normalized spelling (`Tuple<int, int>`, `int?`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSyntax {
    pub text: String,
    pub range: TokenRange,
}

impl TypeSyntax {
    /// Rightmost identifier without type arguments: `A.B<C>` gives `B`.
    pub fn simple_name(&self) -> &str {
        let head = self
            .text
            .split(['<', '?', '[', '*'])
            .next()
            .unwrap_or(&self.text);
        head.rsplit(['.', ':']).next().unwrap_or(head)
    }

    pub fn is_var(&self) -> bool {
        self.text == "var"
    }
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    pub name_token: TokenId,
    pub keyword: TokenId,
    pub type_parameters: Option<String>,
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<Modifier>,
    pub open_brace: Option<TokenId>,
    pub close_brace: Option<TokenId>,
    pub members: Vec<Member>,
    pub range: TokenRange,
}

impl TypeDecl {
    /// Number of type parameters.
    pub fn arity(&self) -> usize {
        self.type_parameters
            .as_deref()
            .map(|params| params.matches(',').count() + 1)
            .unwrap_or(0)
    }

    pub fn has_modifier(&self, text: &str) -> bool {
        self.modifiers.iter().any(|m| m.text == text)
    }

    pub fn is_partial(&self) -> bool {
        self.has_modifier("partial")
    }

    pub fn is_public(&self) -> bool {
        self.has_modifier("public")
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Property(property) => Some(property),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn nested_types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Type(ty) => Some(ty),
            _ => None,
        })
    }

    /// Nested types at any depth, outermost first.
    pub fn descendant_types(&self) -> Vec<&TypeDecl> {
        let mut found = Vec::new();
        let mut stack: Vec<&TypeDecl> = self.nested_types().collect();
        stack.reverse();
        while let Some(ty) = stack.pop() {
            found.push(ty);
            let mut children: Vec<&TypeDecl> = ty.nested_types().collect();
            children.reverse();
            stack.extend(children);
        }
        found
    }
}

#[derive(Debug, Clone)]
pub enum Member {
    Type(TypeDecl),
    Field(FieldDecl),
    Property(PropertyDecl),
    Method(MethodDecl),
    /// Constructors, events, indexers, operators, enums, delegates.
    Other(TokenRange),
}

impl Member {
    pub fn range(&self) -> TokenRange {
        match self {
            Member::Type(ty) => ty.range,
            Member::Field(field) => field.range,
            Member::Property(property) => property.range,
            Member::Method(method) => method.range,
            Member::Other(range) => *range,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub name: String,
    pub name_token: TokenId,
    pub initializer: Option<TokenRange>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub modifiers: Vec<Modifier>,
    pub ty: TypeSyntax,
    pub declarators: Vec<VariableDeclarator>,
    pub range: TokenRange,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub modifiers: Vec<Modifier>,
    pub ty: TypeSyntax,
    pub name: String,
    pub range: TokenRange,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    /// `ref`, `out`, `in`, `params` or `this`.
    pub modifier: Option<String>,
    pub ty: TypeSyntax,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum MethodBody {
    Block(Block),
    Expression(TokenRange),
    None,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub modifiers: Vec<Modifier>,
    pub return_type: TypeSyntax,
    pub name: String,
    pub name_token: TokenId,
    pub parameters: Vec<Parameter>,
    pub body: MethodBody,
    pub range: TokenRange,
}

impl MethodDecl {
    pub fn block(&self) -> Option<&Block> {
        match &self.body {
            MethodBody::Block(block) => Some(block),
            _ => None,
        }
    }

    /// Tokens strictly inside the body, up to and including the closing
    /// brace (whose leading trivia belongs to the body).
    pub fn body_range(&self) -> Option<TokenRange> {
        match &self.body {
            MethodBody::Block(block) => {
                let end = block.close.map(|c| c + 1).unwrap_or(self.range.end);
                Some(TokenRange::new(block.open + 1, end))
            }
            MethodBody::Expression(range) => Some(*range),
            MethodBody::None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub open: TokenId,
    pub close: Option<TokenId>,
    pub statements: Vec<Statement>,
}

/// A list of statements that can receive new statements, with the brace
/// that closes it when it is a block.
#[derive(Debug, Clone, Copy)]
pub struct StatementList<'a> {
    pub statements: &'a [Statement],
    pub close: Option<TokenId>,
}

impl Block {
    /// Visits this block and every statement list nested inside it.
    pub fn visit_statement_lists<'a>(&'a self, f: &mut dyn FnMut(StatementList<'a>)) {
        f(StatementList {
            statements: &self.statements,
            close: self.close,
        });
        for statement in &self.statements {
            statement.visit_statement_lists(f);
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalVariable {
    pub ty: TypeSyntax,
    pub name: String,
    pub name_token: TokenId,
    pub initializer: Option<TokenRange>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub variable: Option<LocalVariable>,
    pub block: Block,
}

#[derive(Debug, Clone)]
pub struct SwitchSection {
    pub labels: TokenRange,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Block(Block),
    LocalDeclaration(Vec<LocalVariable>),
    Expression,
    If {
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    /// `while`, `do`, `for`, `foreach`, `using (...)`, `lock`, `fixed`.
    Loop {
        variables: Vec<LocalVariable>,
        body: Box<Statement>,
    },
    Try {
        block: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Switch {
        sections: Vec<SwitchSection>,
    },
    LocalFunction(Box<MethodDecl>),
    Labeled(Box<Statement>),
    Other,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub range: TokenRange,
    /// Block bodies of lambdas and anonymous methods in this statement's
    /// own expressions, in source order.
    pub lambda_bodies: Vec<Block>,
}

impl Statement {
    /// Pre-order walk over this statement and all nested statements.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Statement)) {
        f(self);
        match &self.kind {
            StatementKind::Block(block) => walk_all(&block.statements, f),
            StatementKind::If {
                then_branch,
                else_branch,
            } => {
                then_branch.walk(f);
                if let Some(else_branch) = else_branch {
                    else_branch.walk(f);
                }
            }
            StatementKind::Loop { body, .. } => body.walk(f),
            StatementKind::Try {
                block,
                catches,
                finally,
            } => {
                walk_all(&block.statements, f);
                for catch in catches {
                    walk_all(&catch.block.statements, f);
                }
                if let Some(finally) = finally {
                    walk_all(&finally.statements, f);
                }
            }
            StatementKind::Switch { sections } => {
                for section in sections {
                    walk_all(&section.statements, f);
                }
            }
            StatementKind::Labeled(inner) => inner.walk(f),
            StatementKind::LocalFunction(_)
            | StatementKind::LocalDeclaration(_)
            | StatementKind::Expression
            | StatementKind::Other => {}
        }
        for body in &self.lambda_bodies {
            walk_all(&body.statements, f);
        }
    }

    /// Variables this statement itself introduces.
    pub fn declared_variables(&self) -> Vec<&LocalVariable> {
        match &self.kind {
            StatementKind::LocalDeclaration(variables) | StatementKind::Loop { variables, .. } => {
                variables.iter().collect()
            }
            StatementKind::Try { catches, .. } => {
                catches.iter().filter_map(|c| c.variable.as_ref()).collect()
            }
            _ => Vec::new(),
        }
    }

    fn visit_statement_lists<'a>(&'a self, f: &mut dyn FnMut(StatementList<'a>)) {
        match &self.kind {
            StatementKind::Block(block) => block.visit_statement_lists(f),
            StatementKind::If {
                then_branch,
                else_branch,
            } => {
                then_branch.visit_statement_lists(f);
                if let Some(else_branch) = else_branch {
                    else_branch.visit_statement_lists(f);
                }
            }
            StatementKind::Loop { body, .. } => body.visit_statement_lists(f),
            StatementKind::Try {
                block,
                catches,
                finally,
            } => {
                block.visit_statement_lists(f);
                for catch in catches {
                    catch.block.visit_statement_lists(f);
                }
                if let Some(finally) = finally {
                    finally.visit_statement_lists(f);
                }
            }
            StatementKind::Switch { sections } => {
                for section in sections {
                    f(StatementList {
                        statements: &section.statements,
                        close: None,
                    });
                    for statement in &section.statements {
                        statement.visit_statement_lists(f);
                    }
                }
            }
            StatementKind::Labeled(inner) => inner.visit_statement_lists(f),
            StatementKind::LocalFunction(function) => {
                if let Some(block) = function.block() {
                    block.visit_statement_lists(f);
                }
            }
            StatementKind::LocalDeclaration(_) | StatementKind::Expression | StatementKind::Other => {}
        }
        for body in &self.lambda_bodies {
            body.visit_statement_lists(f);
        }
    }
}

fn walk_all<'a>(statements: &'a [Statement], f: &mut dyn FnMut(&'a Statement)) {
    for statement in statements {
        statement.walk(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(text: &str) -> TypeSyntax {
        TypeSyntax {
            text: text.to_string(),
            range: TokenRange::default(),
        }
    }

    #[test]
    fn simple_name_strips_qualifiers_and_arguments() {
        assert_eq!(ty("SignalsMultiplex").simple_name(), "SignalsMultiplex");
        assert_eq!(ty("Outer.SignalsMultiplex").simple_name(), "SignalsMultiplex");
        assert_eq!(ty("global::A.B<C.D>").simple_name(), "B");
        assert_eq!(ty("int?").simple_name(), "int");
    }

    #[test]
    fn token_range_last() {
        assert_eq!(TokenRange::new(3, 5).last(), Some(4));
        assert_eq!(TokenRange::new(3, 3).last(), None);
    }
}
