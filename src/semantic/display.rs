//! Canonical display form of type references.

const FRAMEWORK_ALIASES: &[(&str, &str)] = &[
    ("Boolean", "bool"),
    ("Byte", "byte"),
    ("Char", "char"),
    ("Decimal", "decimal"),
    ("Double", "double"),
    ("Int16", "short"),
    ("Int32", "int"),
    ("Int64", "long"),
    ("Object", "object"),
    ("SByte", "sbyte"),
    ("Single", "float"),
    ("String", "string"),
    ("UInt16", "ushort"),
    ("UInt32", "uint"),
    ("UInt64", "ulong"),
];

/// Canonical spelling of a type: framework types by their keyword alias
/// (`System.Int32` is `int`), `Nullable<T>` as `T?`, no `global::`, a single
/// space after each comma.
///
/// Text that does not parse as a type is returned trimmed but otherwise
/// unchanged.
pub fn display_type(text: &str) -> String {
    let tokens = tokenize(text);
    let mut parser = TypeParser { tokens, pos: 0 };
    match parser.parse() {
        Some(node) if parser.pos == parser.tokens.len() => node.render(),
        _ => text.trim().to_string(),
    }
}

#[derive(Debug)]
enum Node {
    Named {
        segments: Vec<(String, Vec<Node>)>,
        suffix: String,
    },
    Tuple {
        elements: Vec<(Node, Option<String>)>,
        suffix: String,
    },
}

impl Node {
    fn render(&self) -> String {
        match self {
            Node::Named { segments, suffix } => {
                let names: Vec<&str> = segments.iter().map(|(name, _)| name.as_str()).collect();
                let last_args = segments.last().map(|(_, args)| args.as_slice()).unwrap_or(&[]);
                let plain = segments.iter().all(|(_, args)| args.is_empty());
                if plain {
                    if let Some(alias) = framework_alias(&names) {
                        return format!("{alias}{suffix}");
                    }
                }
                let nullable = matches!(names.as_slice(), ["Nullable"] | ["System", "Nullable"]);
                if nullable && last_args.len() == 1 {
                    return format!("{}?{suffix}", last_args[0].render());
                }
                let mut out = String::new();
                for (idx, (name, args)) in segments.iter().enumerate() {
                    if idx > 0 {
                        out.push('.');
                    }
                    out.push_str(name);
                    if !args.is_empty() {
                        let rendered: Vec<String> = args.iter().map(Node::render).collect();
                        out.push('<');
                        out.push_str(&rendered.join(", "));
                        out.push('>');
                    }
                }
                out.push_str(suffix);
                out
            }
            Node::Tuple { elements, suffix } => {
                let rendered: Vec<String> = elements
                    .iter()
                    .map(|(ty, name)| match name {
                        Some(name) => format!("{} {name}", ty.render()),
                        None => ty.render(),
                    })
                    .collect();
                format!("({}){suffix}", rendered.join(", "))
            }
        }
    }
}

fn framework_alias(names: &[&str]) -> Option<&'static str> {
    let simple = match names {
        [single] => *single,
        ["System", single] => *single,
        _ => return None,
    };
    FRAMEWORK_ALIASES
        .iter()
        .find(|(name, _)| *name == simple)
        .map(|(_, alias)| *alias)
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch.is_alphanumeric() || ch == '_' || ch == '@' {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '@' {
                    word.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(word);
        } else if ch == ':' {
            chars.next();
            if chars.peek() == Some(&':') {
                chars.next();
                tokens.push("::".to_string());
            } else {
                tokens.push(":".to_string());
            }
        } else {
            tokens.push(ch.to_string());
            chars.next();
        }
    }
    tokens
}

struct TypeParser {
    tokens: Vec<String>,
    pos: usize,
}

impl TypeParser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.peek() == Some(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> Option<String> {
        let token = self.peek()?;
        if token.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '@') {
            let word = token.to_string();
            self.pos += 1;
            Some(word)
        } else {
            None
        }
    }

    fn parse(&mut self) -> Option<Node> {
        if self.eat("(") {
            let mut elements = Vec::new();
            loop {
                let ty = self.parse()?;
                let name = self.word();
                elements.push((ty, name));
                if self.eat(",") {
                    continue;
                }
                if self.eat(")") {
                    break;
                }
                return None;
            }
            let suffix = self.suffix();
            return Some(Node::Tuple { elements, suffix });
        }

        let mut segments = Vec::new();
        let mut name = self.word()?;
        if self.eat("::") {
            // `global::` and extern aliases only qualify the lookup.
            name = self.word()?;
        }
        loop {
            let mut args = Vec::new();
            if self.eat("<") {
                loop {
                    args.push(self.parse()?);
                    if self.eat(",") {
                        continue;
                    }
                    if self.eat(">") {
                        break;
                    }
                    return None;
                }
            }
            segments.push((name, args));
            if self.eat(".") {
                name = self.word()?;
                continue;
            }
            break;
        }
        let suffix = self.suffix();
        Some(Node::Named { segments, suffix })
    }

    fn suffix(&mut self) -> String {
        let mut suffix = String::new();
        loop {
            match self.peek() {
                Some("?") | Some("*") => {
                    suffix.push_str(&self.tokens[self.pos]);
                    self.pos += 1;
                }
                Some("[") => {
                    let start = self.pos;
                    self.pos += 1;
                    let mut rank = String::from("[");
                    while self.eat(",") {
                        rank.push(',');
                    }
                    if !self.eat("]") {
                        self.pos = start;
                        return suffix;
                    }
                    rank.push(']');
                    suffix.push_str(&rank);
                }
                _ => return suffix,
            }
        }
    }
}
