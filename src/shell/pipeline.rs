//! Turns one input line into a [`Pipeline`].
//!
//! Only `|` is an operator here. Everything else a full shell would treat
//! specially (`&&`, `;`, `>`, `$(...)`) is passed through as ordinary text.

use crate::core::commands::Builtin;
use crate::core::env::EnvironmentState;
use crate::path::glob::{self, GLOB_META};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    Builtin { builtin: Builtin, args: Vec<String> },
    External { program: String, args: Vec<String> },
}

impl PipelineStage {
    fn from_tokens(mut tokens: Vec<String>) -> Option<Self> {
        if tokens.is_empty() {
            return None;
        }
        let program = tokens.remove(0);
        Some(match Builtin::from_name(&program) {
            Some(builtin) => PipelineStage::Builtin {
                builtin,
                args: tokens,
            },
            None => PipelineStage::External {
                program,
                args: tokens,
            },
        })
    }

    pub fn program(&self) -> &str {
        match self {
            PipelineStage::Builtin { builtin, .. } => builtin.name(),
            PipelineStage::External { program, .. } => program,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unbalanced {0} quote")]
    UnbalancedQuote(char),
    #[error("unterminated ${{ in variable reference")]
    UnterminatedVariable,
    #[error("missing command around |")]
    EmptyStage,
    #[error("{0}: built-ins cannot be used in a pipeline")]
    BuiltinInPipeline(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn parse(input: &str, env: &EnvironmentState) -> Result<Self, ParseError> {
        if input.trim().is_empty() {
            return Ok(Self::new());
        }

        let raw_stages = split_stages(input)?;
        let multi_stage = raw_stages.len() > 1;
        let mut stages = Vec::with_capacity(raw_stages.len());

        for raw in raw_stages {
            if raw.trim().is_empty() {
                return Err(ParseError::EmptyStage);
            }

            let tokens = tokenize(raw, env)?;
            match PipelineStage::from_tokens(tokens) {
                Some(PipelineStage::Builtin { builtin, .. }) if multi_stage => {
                    return Err(ParseError::BuiltinInPipeline(builtin.name().to_string()));
                }
                Some(stage) => stages.push(stage),
                // Everything expanded away, e.g. a lone `$UNSET`.
                None if multi_stage => return Err(ParseError::EmptyStage),
                None => {}
            }
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }
}

/// Splits on `|` outside quotes and escapes.
fn split_stages(input: &str) -> Result<Vec<&str>, ParseError> {
    let mut stages = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), _) => {}
            (_, '\\') => escaped = true,
            (Some('"'), '"') => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '|') => {
                stages.push(&input[start..index]);
                start = index + 1;
            }
            (None, _) => {}
        }
    }

    if let Some(q) = quote {
        return Err(ParseError::UnbalancedQuote(q));
    }
    stages.push(&input[start..]);
    Ok(stages)
}

/// One word being assembled. `pattern` mirrors `text` with every character
/// that must match literally escaped, so it can be handed to the glob
/// matcher as-is.
#[derive(Default)]
struct Word {
    text: String,
    pattern: String,
    glob: bool,
    quoted: bool,
}

impl Word {
    fn push_literal(&mut self, c: char) {
        self.text.push(c);
        if GLOB_META.contains(&c) {
            self.pattern.push('\\');
        }
        self.pattern.push(c);
    }

    fn push_literal_str(&mut self, s: &str) {
        s.chars().for_each(|c| self.push_literal(c));
    }

    fn push_unquoted(&mut self, c: char) {
        match c {
            '*' | '?' | '[' => {
                self.glob = true;
                self.text.push(c);
                self.pattern.push(c);
            }
            ']' => {
                self.text.push(c);
                self.pattern.push(c);
            }
            _ => self.push_literal(c),
        }
    }

    fn into_tokens(self, env: &EnvironmentState, out: &mut Vec<String>) {
        if self.text.is_empty() && !self.quoted {
            return;
        }
        if self.glob {
            let matches = glob::expand(&self.pattern, env.working_directory());
            if !matches.is_empty() {
                out.extend(matches);
                return;
            }
        }
        out.push(self.text);
    }
}

/// Splits one stage into words, applying quoting, escapes, `$VAR`/`${VAR}`
/// and leading `~` expansion, then glob expansion.
fn tokenize(input: &str, env: &EnvironmentState) -> Result<Vec<String>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut current: Option<Word> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                if let Some(word) = current.take() {
                    word.into_tokens(env, &mut tokens);
                }
                i += 1;
            }
            '\'' => {
                let word = current.get_or_insert_with(Word::default);
                word.quoted = true;
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ParseError::UnbalancedQuote('\'')),
                        Some('\'') => break,
                        Some(&ch) => word.push_literal(ch),
                    }
                    i += 1;
                }
                i += 1;
            }
            '"' => {
                let word = current.get_or_insert_with(Word::default);
                word.quoted = true;
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ParseError::UnbalancedQuote('"')),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') if matches!(chars.get(i + 1), Some('"' | '\\' | '$' | '`')) => {
                            word.push_literal(chars[i + 1]);
                            i += 2;
                        }
                        Some('$') => {
                            let (next, value) = expand_variable(&chars, i, env)?;
                            word.push_literal_str(&value);
                            i = next;
                        }
                        Some(&ch) => {
                            word.push_literal(ch);
                            i += 1;
                        }
                    }
                }
            }
            '\\' => {
                let word = current.get_or_insert_with(Word::default);
                match chars.get(i + 1) {
                    Some(&next) => {
                        word.push_literal(next);
                        word.quoted = true;
                        i += 2;
                    }
                    None => {
                        word.push_literal('\\');
                        i += 1;
                    }
                }
            }
            '$' => {
                let (next, value) = expand_variable(&chars, i, env)?;
                current
                    .get_or_insert_with(Word::default)
                    .push_literal_str(&value);
                i = next;
            }
            '~' if current.is_none() && ends_tilde_prefix(chars.get(i + 1)) => {
                let word = current.get_or_insert_with(Word::default);
                match env.home_dir() {
                    Ok(home) => word.push_literal_str(&home.to_string_lossy()),
                    Err(_) => word.push_literal('~'),
                }
                i += 1;
            }
            _ => {
                current.get_or_insert_with(Word::default).push_unquoted(c);
                i += 1;
            }
        }
    }

    if let Some(word) = current.take() {
        word.into_tokens(env, &mut tokens);
    }
    Ok(tokens)
}

/// A word-initial `~` means home only when followed by `/` or the word end.
fn ends_tilde_prefix(next: Option<&char>) -> bool {
    !matches!(next, Some(&c) if c != '/' && !c.is_whitespace())
}

/// Expands the reference starting at `chars[start] == '$'`. Returns the index
/// just past the reference and its value; unset names expand to "".
fn expand_variable(
    chars: &[char],
    start: usize,
    env: &EnvironmentState,
) -> Result<(usize, String), ParseError> {
    let lookup = |name: &str| env.get(name).unwrap_or_default().to_string();

    match chars.get(start + 1) {
        Some('{') => {
            let close = chars[start + 2..]
                .iter()
                .position(|&c| c == '}')
                .ok_or(ParseError::UnterminatedVariable)?;
            let name: String = chars[start + 2..start + 2 + close].iter().collect();
            Ok((start + 3 + close, lookup(&name)))
        }
        Some(&c) if c == '_' || c.is_ascii_alphabetic() => {
            let len = chars[start + 1..]
                .iter()
                .take_while(|&&c| c == '_' || c.is_ascii_alphanumeric())
                .count();
            let name: String = chars[start + 1..start + 1 + len].iter().collect();
            Ok((start + 1 + len, lookup(&name)))
        }
        _ => Ok((start + 1, "$".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn setup_env() -> EnvironmentState {
        let mut env = EnvironmentState::new(std::env::temp_dir());
        env.set("NAME", "world").unwrap();
        env.set("SPACED", "hello world").unwrap();
        env.set("HOME", "/home/test").unwrap();
        env
    }

    fn words(input: &str) -> Vec<String> {
        tokenize(input, &setup_env()).unwrap()
    }

    fn external(program: &str, args: &[&str]) -> PipelineStage {
        PipelineStage::External {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_empty_input() {
        let env = setup_env();
        assert!(Pipeline::parse("", &env).unwrap().is_empty());
        assert!(Pipeline::parse("   \t", &env).unwrap().is_empty());
        assert!(Pipeline::parse("$UNSET_THING", &env).unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_and_quotes() {
        assert_eq!(words("echo    spaced   out"), vec!["echo", "spaced", "out"]);
        assert_eq!(
            words("echo \"quoted  arg\" 'single  quoted'"),
            vec!["echo", "quoted  arg", "single  quoted"]
        );
        assert_eq!(words("echo a\"b c\"d"), vec!["echo", "ab cd"]);
        assert_eq!(words("echo \"\" ''"), vec!["echo", "", ""]);
    }

    #[test]
    fn test_variable_expansion() {
        assert_eq!(words("echo $NAME"), vec!["echo", "world"]);
        assert_eq!(words("echo ${NAME}s"), vec!["echo", "worlds"]);
        assert_eq!(words("echo \"$SPACED!\""), vec!["echo", "hello world!"]);
        assert_eq!(words("echo '$NAME'"), vec!["echo", "$NAME"]);
        assert_eq!(words("echo $MISSING end"), vec!["echo", "end"]);
        assert_eq!(words("echo \"$MISSING\""), vec!["echo", ""]);
        assert_eq!(words("echo $ 5$"), vec!["echo", "$", "5$"]);
        assert_eq!(words("echo \\$NAME"), vec!["echo", "$NAME"]);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(words("echo a\\ b"), vec!["echo", "a b"]);
        assert_eq!(words("echo \"say \\\"hi\\\"\""), vec!["echo", "say \"hi\""]);
        assert_eq!(words("echo \"keep \\n\""), vec!["echo", "keep \\n"]);
    }

    #[test]
    fn test_tilde() {
        assert_eq!(words("ls ~ ~/src a~b '~'"), vec!["ls", "/home/test", "/home/test/src", "a~b", "~"]);
    }

    #[test]
    fn test_unbalanced_quotes() {
        let env = setup_env();
        assert_eq!(
            Pipeline::parse("echo \"open", &env),
            Err(ParseError::UnbalancedQuote('"'))
        );
        assert_eq!(
            Pipeline::parse("echo 'open", &env),
            Err(ParseError::UnbalancedQuote('\''))
        );
        assert_eq!(
            Pipeline::parse("echo ${OPEN", &env),
            Err(ParseError::UnterminatedVariable)
        );
    }

    #[test]
    fn test_pipeline_split() {
        let env = setup_env();
        let pipeline = Pipeline::parse("echo \"a|b\" | wc -c|sort", &env).unwrap();
        assert_eq!(
            pipeline.stages(),
            &[
                external("echo", &["a|b"]),
                external("wc", &["-c"]),
                external("sort", &[]),
            ]
        );
        assert_eq!(pipeline.len(), 3);
    }

    #[test]
    fn test_unsupported_operators_are_literal() {
        let env = setup_env();
        let pipeline = Pipeline::parse("echo a && echo b > out", &env).unwrap();
        assert_eq!(
            pipeline.stages(),
            &[external("echo", &["a", "&&", "echo", "b", ">", "out"])]
        );
    }

    #[test]
    fn test_empty_stages() {
        let env = setup_env();
        assert_eq!(Pipeline::parse("ls |", &env), Err(ParseError::EmptyStage));
        assert_eq!(Pipeline::parse("| wc", &env), Err(ParseError::EmptyStage));
        assert_eq!(Pipeline::parse("ls || wc", &env), Err(ParseError::EmptyStage));
    }

    #[test]
    fn test_builtins() {
        let env = setup_env();
        let pipeline = Pipeline::parse("export A=\"x y\"", &env).unwrap();
        assert_eq!(
            pipeline.stages(),
            &[PipelineStage::Builtin {
                builtin: Builtin::Export,
                args: vec!["A=x y".to_string()],
            }]
        );
        assert_eq!(pipeline.stages()[0].program(), "export");

        assert_eq!(
            Pipeline::parse("export X=1 | cat", &env),
            Err(ParseError::BuiltinInPipeline("export".to_string()))
        );
        assert_eq!(
            Pipeline::parse("ls | cd /tmp", &env),
            Err(ParseError::BuiltinInPipeline("cd".to_string()))
        );
    }

    #[test]
    fn test_glob_expansion() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.md"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let mut env = setup_env();
        env.set_working_directory(dir.path()).unwrap();

        let tokens = tokenize("ls *.txt '*.txt' \"*\".md *.rs", &env).unwrap();
        assert_eq!(tokens, vec!["ls", "a.txt", "b.txt", "*.txt", "*.md", "*.rs"]);

        let tokens = tokenize("ls [ab].txt \\*.txt", &env).unwrap();
        assert_eq!(tokens, vec!["ls", "a.txt", "b.txt", "*.txt"]);
    }
}
