//! A lightweight GraphQL document parser.
//!
//! It recognises operations, variable definitions, root fields with their
//! argument names, and fragments: enough to check a query against a
//! discovered catalog before it is sent. Nested selections are parsed for
//! syntax only.

use std::fmt;

use serde::Serialize;

use crate::error::GraphError;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "query" => Some(OperationKind::Query),
            "mutation" => Some(OperationKind::Mutation),
            "subscription" => Some(OperationKind::Subscription),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDefinition {
    pub name: String,
    /// SDL notation, e.g. `[ID!]!`.
    pub type_name: String,
    /// Source text of the default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// A field selected directly on the operation's root type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootField {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDefinition {
    pub kind: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub fields: Vec<RootField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDocument {
    pub operations: Vec<OperationDefinition>,
    /// Names of the fragment definitions.
    pub fragments: Vec<String>,
}

impl QueryDocument {
    /// The operation a request would run: the one called `name`, or the only
    /// one when no name is given.
    pub fn operation(&self, name: Option<&str>) -> Result<&OperationDefinition, String> {
        match name {
            Some(name) => self
                .operations
                .iter()
                .find(|op| op.name.as_deref() == Some(name))
                .ok_or_else(|| format!("document has no operation named '{name}'")),
            None => match self.operations.as_slice() {
                [only] => Ok(only),
                _ => Err(
                    "an operation name is required when the document contains multiple operations"
                        .to_string(),
                ),
            },
        }
    }
}

/// Parse a query document, reporting the first syntax error with its
/// line and column.
pub fn parse_query(source: &str) -> Result<QueryDocument, GraphError> {
    Parser::new(source)?.document()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Punct(char),
    Spread,
    Name,
    Int,
    Float,
    Str,
    Eof,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: Kind,
    start: usize,
    end: usize,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn error(&self, at: usize, message: impl Into<String>) -> GraphError {
        syntax_error(self.src, at, message)
    }

    fn skip_ignored(&mut self) {
        while let Some(c) = self.src[self.pos..].chars().next() {
            match c {
                ' ' | '\t' | '\n' | '\r' | ',' | '\u{feff}' => self.pos += c.len_utf8(),
                '#' => {
                    let rest = &self.src[self.pos..];
                    self.pos += rest.find('\n').unwrap_or(rest.len());
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, GraphError> {
        self.skip_ignored();
        let start = self.pos;
        let Some(c) = self.src[start..].chars().next() else {
            return Ok(Token {
                kind: Kind::Eof,
                start,
                end: start,
            });
        };

        let kind = match c {
            '!' | '$' | '&' | '(' | ')' | ':' | '=' | '@' | '[' | ']' | '{' | '|' | '}' => {
                self.pos += 1;
                Kind::Punct(c)
            }
            '.' => {
                if self.src[start..].starts_with("...") {
                    self.pos += 3;
                    Kind::Spread
                } else {
                    return Err(self.error(start, "unexpected '.', did you mean '...'?"));
                }
            }
            '_' | 'a'..='z' | 'A'..='Z' => {
                while matches!(self.peek_byte(0), Some(b'_' | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')) {
                    self.pos += 1;
                }
                Kind::Name
            }
            '-' | '0'..='9' => self.number()?,
            '"' => self.string()?,
            other => return Err(self.error(start, format!("unexpected character '{other}'"))),
        };
        Ok(Token {
            kind,
            start,
            end: self.pos,
        })
    }

    fn digits(&mut self) -> usize {
        let from = self.pos;
        while matches!(self.peek_byte(0), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - from
    }

    fn number(&mut self) -> Result<Kind, GraphError> {
        let start = self.pos;
        if self.peek_byte(0) == Some(b'-') {
            self.pos += 1;
        }
        if self.digits() == 0 {
            return Err(self.error(start, "expected a digit"));
        }
        let mut kind = Kind::Int;
        if self.peek_byte(0) == Some(b'.') {
            self.pos += 1;
            if self.digits() == 0 {
                return Err(self.error(self.pos, "expected a digit after '.'"));
            }
            kind = Kind::Float;
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek_byte(0), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.digits() == 0 {
                return Err(self.error(self.pos, "expected a digit in exponent"));
            }
            kind = Kind::Float;
        }
        Ok(kind)
    }

    fn string(&mut self) -> Result<Kind, GraphError> {
        let start = self.pos;
        if self.src[start..].starts_with("\"\"\"") {
            self.pos += 3;
            loop {
                let rest = &self.src[self.pos..];
                if rest.starts_with("\\\"\"\"") {
                    self.pos += 4;
                } else if rest.starts_with("\"\"\"") {
                    self.pos += 3;
                    return Ok(Kind::Str);
                } else if let Some(c) = rest.chars().next() {
                    self.pos += c.len_utf8();
                } else {
                    return Err(self.error(start, "unterminated block string"));
                }
            }
        }

        self.pos += 1;
        loop {
            match self.src[self.pos..].chars().next() {
                Some('"') => {
                    self.pos += 1;
                    return Ok(Kind::Str);
                }
                Some('\\') => {
                    self.pos += 1;
                    if let Some(escaped) = self.src[self.pos..].chars().next() {
                        self.pos += escaped.len_utf8();
                    }
                }
                Some('\n' | '\r') | None => {
                    return Err(self.error(start, "unterminated string"));
                }
                Some(c) => self.pos += c.len_utf8(),
            }
        }
    }
}

fn syntax_error(src: &str, at: usize, message: impl Into<String>) -> GraphError {
    let before = &src[..at.min(src.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0)
        + 1;
    GraphError::Syntax {
        message: message.into(),
        line,
        column,
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// End offset of the last consumed token.
    last_end: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Result<Self, GraphError> {
        let mut lexer = Lexer { src, pos: 0 };
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            last_end: 0,
        })
    }

    fn text(&self, token: Token) -> &'a str {
        let src: &'a str = self.lexer.src;
        &src[token.start..token.end]
    }

    fn describe(&self, token: Token) -> String {
        match token.kind {
            Kind::Eof => "end of document".to_string(),
            _ => format!("'{}'", self.text(token)),
        }
    }

    fn unexpected(&self, expected: &str) -> GraphError {
        syntax_error(
            self.lexer.src,
            self.current.start,
            format!("expected {expected}, found {}", self.describe(self.current)),
        )
    }

    fn advance(&mut self) -> Result<Token, GraphError> {
        let next = self.lexer.next_token()?;
        self.last_end = self.current.end;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn at_punct(&self, c: char) -> bool {
        self.current.kind == Kind::Punct(c)
    }

    fn at_keyword(&self, word: &str) -> bool {
        self.current.kind == Kind::Name && self.text(self.current) == word
    }

    fn expect_punct(&mut self, c: char) -> Result<(), GraphError> {
        if !self.at_punct(c) {
            return Err(self.unexpected(&format!("'{c}'")));
        }
        self.advance()?;
        Ok(())
    }

    fn expect_name(&mut self) -> Result<String, GraphError> {
        if self.current.kind != Kind::Name {
            return Err(self.unexpected("a name"));
        }
        let token = self.advance()?;
        Ok(self.text(token).to_string())
    }

    fn document(&mut self) -> Result<QueryDocument, GraphError> {
        let mut doc = QueryDocument {
            operations: Vec::new(),
            fragments: Vec::new(),
        };
        while self.current.kind != Kind::Eof {
            if self.at_punct('{') {
                let fields = self.selection_set(0)?;
                doc.operations.push(OperationDefinition {
                    kind: OperationKind::Query,
                    name: None,
                    variables: Vec::new(),
                    fields,
                });
                continue;
            }
            if self.at_keyword("fragment") {
                let name = self.fragment()?;
                doc.fragments.push(name);
                continue;
            }
            let kind = match self.current.kind {
                Kind::Name => OperationKind::from_keyword(self.text(self.current)),
                _ => None,
            };
            let Some(kind) = kind else {
                return Err(self.unexpected("an operation or fragment definition"));
            };
            self.advance()?;
            doc.operations.push(self.operation(kind)?);
        }
        if doc.operations.is_empty() {
            return Err(syntax_error(
                self.lexer.src,
                self.current.start,
                "document contains no operations",
            ));
        }
        Ok(doc)
    }

    fn operation(&mut self, kind: OperationKind) -> Result<OperationDefinition, GraphError> {
        let name = if self.current.kind == Kind::Name {
            Some(self.expect_name()?)
        } else {
            None
        };
        let variables = if self.at_punct('(') {
            self.variable_definitions()?
        } else {
            Vec::new()
        };
        self.directives(0)?;
        let fields = self.selection_set(0)?;
        Ok(OperationDefinition {
            kind,
            name,
            variables,
            fields,
        })
    }

    fn fragment(&mut self) -> Result<String, GraphError> {
        self.advance()?;
        if self.at_keyword("on") {
            return Err(self.unexpected("a fragment name"));
        }
        let name = self.expect_name()?;
        if !self.at_keyword("on") {
            return Err(self.unexpected("'on'"));
        }
        self.advance()?;
        self.expect_name()?;
        self.directives(0)?;
        self.selection_set(1)?;
        Ok(name)
    }

    fn variable_definitions(&mut self) -> Result<Vec<VariableDefinition>, GraphError> {
        self.expect_punct('(')?;
        let mut variables = Vec::new();
        loop {
            self.expect_punct('$')?;
            let name = self.expect_name()?;
            self.expect_punct(':')?;
            let type_name = self.type_reference(0)?;
            let default_value = if self.at_punct('=') {
                self.advance()?;
                let start = self.current.start;
                self.value(0)?;
                Some(self.lexer.src[start..self.last_end].to_string())
            } else {
                None
            };
            self.directives(0)?;
            variables.push(VariableDefinition {
                name,
                type_name,
                default_value,
            });
            if self.at_punct(')') {
                self.advance()?;
                return Ok(variables);
            }
        }
    }

    fn type_reference(&mut self, depth: usize) -> Result<String, GraphError> {
        self.guard(depth)?;
        let mut rendered = if self.at_punct('[') {
            self.advance()?;
            let inner = self.type_reference(depth + 1)?;
            self.expect_punct(']')?;
            format!("[{inner}]")
        } else {
            self.expect_name()?
        };
        if self.at_punct('!') {
            self.advance()?;
            rendered.push('!');
        }
        Ok(rendered)
    }

    fn directives(&mut self, depth: usize) -> Result<(), GraphError> {
        while self.at_punct('@') {
            self.advance()?;
            self.expect_name()?;
            if self.at_punct('(') {
                self.arguments(depth)?;
            }
        }
        Ok(())
    }

    fn arguments(&mut self, depth: usize) -> Result<Vec<String>, GraphError> {
        self.expect_punct('(')?;
        let mut names = Vec::new();
        loop {
            let name = self.expect_name()?;
            self.expect_punct(':')?;
            self.value(depth + 1)?;
            names.push(name);
            if self.at_punct(')') {
                self.advance()?;
                return Ok(names);
            }
        }
    }

    fn value(&mut self, depth: usize) -> Result<(), GraphError> {
        self.guard(depth)?;
        match self.current.kind {
            Kind::Punct('$') => {
                self.advance()?;
                self.expect_name()?;
            }
            Kind::Int | Kind::Float | Kind::Str | Kind::Name => {
                self.advance()?;
            }
            Kind::Punct('[') => {
                self.advance()?;
                while !self.at_punct(']') {
                    if self.current.kind == Kind::Eof {
                        return Err(self.unexpected("']'"));
                    }
                    self.value(depth + 1)?;
                }
                self.advance()?;
            }
            Kind::Punct('{') => {
                self.advance()?;
                while !self.at_punct('}') {
                    self.expect_name()?;
                    self.expect_punct(':')?;
                    self.value(depth + 1)?;
                }
                self.advance()?;
            }
            _ => return Err(self.unexpected("a value")),
        }
        Ok(())
    }

    /// Parse `{ ... }`. Fields are collected only at depth 0, including
    /// those inside inline fragments on the root type.
    fn selection_set(&mut self, depth: usize) -> Result<Vec<RootField>, GraphError> {
        self.guard(depth)?;
        self.expect_punct('{')?;
        if self.at_punct('}') {
            return Err(self.unexpected("at least one selection"));
        }
        let mut fields = Vec::new();
        while !self.at_punct('}') {
            match self.current.kind {
                Kind::Spread => {
                    self.advance()?;
                    if self.at_keyword("on") {
                        self.advance()?;
                        self.expect_name()?;
                        self.directives(depth)?;
                        fields.extend(self.selection_set(depth)?);
                    } else if self.current.kind == Kind::Name {
                        self.advance()?;
                        self.directives(depth)?;
                    } else {
                        self.directives(depth)?;
                        fields.extend(self.selection_set(depth)?);
                    }
                }
                Kind::Name => fields.push(self.field(depth)?),
                _ => return Err(self.unexpected("a field, fragment spread or '}'")),
            }
        }
        self.advance()?;
        if depth > 0 {
            fields.clear();
        }
        Ok(fields)
    }

    fn field(&mut self, depth: usize) -> Result<RootField, GraphError> {
        let first = self.expect_name()?;
        let (alias, name) = if self.at_punct(':') {
            self.advance()?;
            (Some(first), self.expect_name()?)
        } else {
            (None, first)
        };
        let arguments = if self.at_punct('(') {
            self.arguments(depth)?
        } else {
            Vec::new()
        };
        self.directives(depth)?;
        if self.at_punct('{') {
            self.selection_set(depth + 1)?;
        }
        Ok(RootField {
            name,
            alias,
            arguments,
        })
    }

    fn guard(&self, depth: usize) -> Result<(), GraphError> {
        if depth > MAX_DEPTH {
            return Err(syntax_error(
                self.lexer.src,
                self.current.start,
                "document nests too deeply",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax(query: &str) -> (String, usize, usize) {
        match parse_query(query) {
            Err(GraphError::Syntax {
                message,
                line,
                column,
            }) => (message, line, column),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn shorthand_query() {
        let doc = parse_query("{ viewer { login } }").unwrap();
        let op = doc.operation(None).unwrap();
        assert_eq!(op.kind, OperationKind::Query);
        assert!(op.name.is_none());
        assert_eq!(op.fields.len(), 1);
        assert_eq!(op.fields[0].name, "viewer");
    }

    #[test]
    fn named_operation_with_variables_and_arguments() {
        let doc = parse_query(
            r#"
            # fetch one user
            query GetUser($id: ID!, $first: Int = 10, $tags: [String!]) {
              me: user(id: $id, filter: { active: true, roles: ["admin", "dev"] }) @include(if: true) {
                id
                posts(first: $first) { edges { node { title } } }
              }
              __typename
            }
            "#,
        )
        .unwrap();
        let op = doc.operation(Some("GetUser")).unwrap();
        assert_eq!(op.variables.len(), 3);
        assert_eq!(op.variables[0].type_name, "ID!");
        assert_eq!(op.variables[1].default_value.as_deref(), Some("10"));
        assert_eq!(op.variables[2].type_name, "[String!]");

        let names: Vec<&str> = op.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["user", "__typename"]);
        assert_eq!(op.fields[0].alias.as_deref(), Some("me"));
        assert_eq!(op.fields[0].arguments, vec!["id", "filter"]);
    }

    #[test]
    fn fragments_and_inline_fragments() {
        let doc = parse_query(
            r#"
            mutation Rename { renameUser(id: "1", name: """Block "quoted" text""") { ...UserParts } }
            fragment UserParts on User { id ... on Admin { level } }
            query Roots { ... on Query { health } }
            "#,
        )
        .unwrap();
        assert_eq!(doc.fragments, vec!["UserParts"]);
        assert_eq!(doc.operations.len(), 2);
        assert_eq!(doc.operations[0].kind, OperationKind::Mutation);
        assert_eq!(doc.operations[1].fields[0].name, "health");
        assert!(doc.operation(None).is_err());
        assert!(doc.operation(Some("Missing")).is_err());
    }

    #[test]
    fn reports_position_of_syntax_errors() {
        let (message, line, column) = syntax("query {\n  user(id: ) { id }\n}");
        assert_eq!(message, "expected a value, found ')'");
        assert_eq!((line, column), (2, 12));

        let (message, _, _) = syntax("{ user { id }");
        assert_eq!(message, "expected a field, fragment spread or '}', found end of document");

        let (message, _, _) = syntax("query { user(name: \"open) { id } }");
        assert_eq!(message, "unterminated string");

        let (message, _, _) = syntax("fragment F on User { id }");
        assert_eq!(message, "document contains no operations");

        let (message, _, _) = syntax("query { }");
        assert_eq!(message, "expected at least one selection, found '}'");

        let (message, _, _) = syntax("querry { id }");
        assert_eq!(
            message,
            "expected an operation or fragment definition, found 'querry'"
        );
    }
}
