use logos::Logos;

/// Raw markup tokens
///
/// Everything that is not a tag opener, a closer or a verbatim run is text.
/// Stray `<` and `#` characters are lexed separately and folded back into
/// text by the parser.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    /// `<#~`, either a verbatim run or a plain `<#` opener
    #[token("<#~", lex_tilde)]
    Tilde(TildeRun),

    /// `<#TAG`, `<-#TAG` or `<#-TAG`, carries the opener text as written
    #[regex(r"<-?#[-A-Za-z0-9]*", |lex| lex.slice().to_string())]
    Open(String),

    #[token("#>")]
    Close,

    #[regex(r"[^<#]+", |lex| lex.slice().to_string())]
    Text(String),

    #[regex(r"[<#]", |lex| lex.slice().to_string())]
    Stray(String),
}

/// What a `<#~` opener turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum TildeRun {
    /// `<#~DELIM~ ... ~DELIM~#>`, carries the literal body
    Verbatim(String),
    /// No `~` closes the delimiter: an untagged `<#` opener whose text starts with `~`
    Opener,
}

/// Consume a verbatim body up to its `~DELIM~#>` terminator, or to end of input
fn lex_tilde(lex: &mut logos::Lexer<Token>) -> TildeRun {
    let rest = lex.remainder();
    let Some(delim_end) = rest.find('~') else {
        return TildeRun::Opener;
    };
    let terminator = format!("~{}~#>", &rest[..delim_end]);
    let body_start = delim_end + 1;
    let body = &rest[body_start..];
    match body.find(&terminator) {
        Some(end) => {
            lex.bump(body_start + end + terminator.len());
            TildeRun::Verbatim(body[..end].to_string())
        }
        None => {
            lex.bump(rest.len());
            TildeRun::Verbatim(body.to_string())
        }
    }
}

/// A token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub offset: usize,
}

/// Tokenize raw markup
///
/// The token set covers every input character, so this never fails.
pub fn tokenize(source: &str) -> Vec<SpannedToken> {
    let mut lex = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lex.next() {
        let offset = lex.span().start;
        let token = match result {
            Ok(token) => token,
            Err(_) => Token::Text(lex.slice().to_string()),
        };
        tokens.push(SpannedToken { token, offset });
    }

    tokens
}

/// 1-based line and column of a byte offset
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|pos| pos + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_open_and_close() {
        assert_eq!(
            kinds("<#LP a: b#>"),
            vec![
                Token::Open("<#LP".into()),
                Token::Text(" a: b".into()),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_non_emitting_openers() {
        assert_eq!(kinds("<-#LP")[0], Token::Open("<-#LP".into()));
        assert_eq!(kinds("<#-LP")[0], Token::Open("<#-LP".into()));
    }

    #[test]
    fn test_stray_characters() {
        assert_eq!(
            kinds("a < b # c"),
            vec![
                Token::Text("a ".into()),
                Token::Stray("<".into()),
                Token::Text(" b ".into()),
                Token::Stray("#".into()),
                Token::Text(" c".into()),
            ]
        );
    }

    #[test]
    fn test_verbatim_run() {
        assert_eq!(
            kinds("x<#~q~<#LP not a tag#>~q~#>y"),
            vec![
                Token::Text("x".into()),
                Token::Tilde(TildeRun::Verbatim("<#LP not a tag#>".into())),
                Token::Text("y".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_verbatim_runs_to_end() {
        assert_eq!(
            kinds("<#~~abc #>"),
            vec![Token::Tilde(TildeRun::Verbatim("abc #>".into()))]
        );
    }

    #[test]
    fn test_tilde_without_delimiter_opens_tag() {
        assert_eq!(
            kinds("<#~: anon#>"),
            vec![
                Token::Tilde(TildeRun::Opener),
                Token::Text(": anon".into()),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_line_col() {
        let source = "ab\ncd\nef";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 4), (2, 2));
        assert_eq!(line_col(source, 100), (3, 3));
    }
}
