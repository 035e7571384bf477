use std::io::{BufReader, Bytes, Read};

use super::diagnostic::Diagnostic;

/// Maximum number of characters that may be waiting for re-delivery.
pub const PUSHBACK_CAPACITY: usize = 20;

pub const VARIABLE_QUOTE: char = '”';
const LITERAL_OPEN: char = '「';
const LITERAL_CLOSE: char = '」';
const LINE_COMMENT: char = '＃';
const BLOCK_COMMENT: char = '＄';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Main,
    Variable,
    Number,
    PrintLit,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Period,
    Wo,
    Ni,
    Kara,
    Ga,
    Declare,
    Div,
    Assign,
    Add,
    Mul,
    Sub,
    Input,
    Output,
    Loop,
    If,
    ElseIf,
    Else,
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
    And,
    Or,
}

impl TokenKind {
    /// Canonical source spelling. Empty for kinds whose text varies.
    pub fn spelling(self) -> &'static str {
        match self {
            TokenKind::Eof | TokenKind::Variable | TokenKind::Number | TokenKind::PrintLit => "",
            TokenKind::Main => "メイン",
            TokenKind::LParen => "（",
            TokenKind::RParen => "）",
            TokenKind::LBrace => "｛",
            TokenKind::RBrace => "｝",
            TokenKind::Period => "。",
            TokenKind::Wo => "を",
            TokenKind::Ni => "に",
            TokenKind::Kara => "から",
            TokenKind::Ga => "が",
            TokenKind::Declare => "で宣言する",
            TokenKind::Div => "でわる",
            TokenKind::Assign => "を代入する",
            TokenKind::Add => "をたす",
            TokenKind::Mul => "をかける",
            TokenKind::Sub => "をひく",
            TokenKind::Input => "入力する",
            TokenKind::Output => "と出力する",
            TokenKind::Loop => "ループ",
            TokenKind::If => "もし",
            TokenKind::ElseIf => "ではなく",
            TokenKind::Else => "ではない",
            TokenKind::Ge => "以上か",
            TokenKind::Le => "以下か",
            TokenKind::Gt => "より大きいか",
            TokenKind::Lt => "より小さいか",
            TokenKind::Eq => "と一緒か",
            TokenKind::Ne => "と違うか",
            TokenKind::And => "かつ",
            TokenKind::Or => "または",
        }
    }

    /// Human readable name used in "expected ..." diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of file",
            TokenKind::Variable => "variable",
            TokenKind::Number => "numeric literal",
            TokenKind::PrintLit => "print literal",
            other => other.spelling(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub space_before: bool,
    pub newline_before: bool,
}

impl Token {
    pub fn display_text(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Variable => format!("{VARIABLE_QUOTE}{}{VARIABLE_QUOTE}", self.text),
            TokenKind::Number | TokenKind::PrintLit => {
                format!("{LITERAL_OPEN}{}{LITERAL_CLOSE}", self.text)
            }
            _ => self.text.clone(),
        }
    }

    pub fn is_glued(&self) -> bool {
        !self.space_before && !self.newline_before
    }
}

pub struct Lexer<R: Read> {
    bytes: Bytes<BufReader<R>>,
    pushback: Vec<char>,
    line: usize,
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: BufReader::new(reader).bytes(),
            pushback: Vec::with_capacity(PUSHBACK_CAPACITY),
            line: 1,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token, Diagnostic> {
        let (space_before, newline_before) = self.skip_trivia()?;
        let line = self.line;
        let Some(ch) = self.get_char()? else {
            return Ok(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line,
                space_before,
                newline_before,
            });
        };
        let (kind, text) = match ch {
            VARIABLE_QUOTE => {
                let name = self.read_quoted(VARIABLE_QUOTE, "variable name", line)?;
                if name.is_empty() {
                    return Err(Diagnostic::lexical(line, "empty variable name `””`"));
                }
                (TokenKind::Variable, name)
            }
            LITERAL_OPEN => {
                let raw = self.read_quoted(LITERAL_CLOSE, "literal", line)?;
                match normalize_number(&raw) {
                    Some(number) => (TokenKind::Number, number),
                    None => (TokenKind::PrintLit, raw),
                }
            }
            _ => {
                let kind = self.lex_word(ch, line)?;
                (kind, kind.spelling().to_string())
            }
        };
        tracing::trace!(?kind, %text, line, "token");
        Ok(Token {
            kind,
            text,
            line,
            space_before,
            newline_before,
        })
    }

    /// Consume whitespace and comments, reporting whether a space and/or a
    /// line break separated the previous token from the next one.
    fn skip_trivia(&mut self) -> Result<(bool, bool), Diagnostic> {
        let mut space = false;
        let mut newline = false;
        loop {
            let Some(ch) = self.get_char()? else {
                return Ok((space, newline));
            };
            match ch {
                ' ' | '\t' | '\u{3000}' => space = true,
                '\n' => newline = true,
                LINE_COMMENT => {
                    while let Some(c) = self.get_char()? {
                        if c == '\n' {
                            break;
                        }
                    }
                    space = true;
                }
                BLOCK_COMMENT => {
                    if self.skip_block_comment()? {
                        newline = true;
                    } else {
                        space = true;
                    }
                }
                other => {
                    self.unget_char(other)?;
                    return Ok((space, newline));
                }
            }
        }
    }

    /// Returns true when the comment contained a line break.
    fn skip_block_comment(&mut self) -> Result<bool, Diagnostic> {
        let mut spans_line = false;
        while let Some(c) = self.get_char()? {
            match c {
                '\n' => spans_line = true,
                BLOCK_COMMENT => {
                    match self.get_char()? {
                        Some('\n') => spans_line = true,
                        Some(other) => self.unget_char(other)?,
                        None => {}
                    }
                    break;
                }
                _ => {}
            }
        }
        Ok(spans_line)
    }

    fn read_quoted(&mut self, close: char, what: &str, line: usize) -> Result<String, Diagnostic> {
        let mut text = String::new();
        loop {
            match self.get_char()? {
                None => {
                    return Err(Diagnostic::lexical(
                        line,
                        format!("end of file inside {what}; missing closing `{close}`"),
                    ));
                }
                Some('\n') => {
                    return Err(Diagnostic::lexical(
                        line,
                        format!("unterminated {what}; missing closing `{close}` before end of line"),
                    ));
                }
                Some(ch) if ch == close => return Ok(text),
                Some(ch) => text.push(ch),
            }
        }
    }

    fn lex_word(&mut self, lead: char, line: usize) -> Result<TokenKind, Diagnostic> {
        use TokenKind::*;

        let kind = match lead {
            '（' => Some(LParen),
            '）' => Some(RParen),
            '｛' => Some(LBrace),
            '｝' => Some(RBrace),
            '。' => Some(Period),
            'に' => Some(Ni),
            'が' => Some(Ga),
            'メ' => self.match_any(&[("イン", Main)])?,
            'で' => match self.match_any(&[("宣言する", Declare), ("わる", Div)])? {
                Some(kind) => Some(kind),
                None if self.try_continue("は")? => Some(
                    self.match_any(&[("なく", ElseIf), ("ない", Else)])?
                        .ok_or_else(|| unknown_keyword("では", line))?,
                ),
                None => None,
            },
            'を' => Some(
                self.match_any(&[
                    ("代入する", Assign),
                    ("たす", Add),
                    ("かける", Mul),
                    ("ひく", Sub),
                ])?
                .unwrap_or(Wo),
            ),
            'か' => self.match_any(&[("ら", Kara), ("つ", And)])?,
            'ル' => self.match_any(&[("ープ", Loop)])?,
            'も' => self.match_any(&[("し", If)])?,
            '入' => self.match_any(&[("力する", Input)])?,
            'と' => self.match_any(&[("出力する", Output), ("一緒か", Eq), ("違うか", Ne)])?,
            'ま' => self.match_any(&[("たは", Or)])?,
            '以' => self.match_any(&[("上か", Ge), ("下か", Le)])?,
            'よ' if self.try_continue("り")? => Some(
                self.match_any(&[("大きいか", Gt), ("小さいか", Lt)])?
                    .ok_or_else(|| unknown_keyword("より", line))?,
            ),
            'よ' => None,
            _ => {
                return Err(Diagnostic::lexical(
                    line,
                    format!("unknown token `{}`", lead.escape_debug()),
                ));
            }
        };
        kind.ok_or_else(|| unknown_keyword(&lead.to_string(), line))
    }

    fn match_any(&mut self, candidates: &[(&str, TokenKind)]) -> Result<Option<TokenKind>, Diagnostic> {
        for (rest, kind) in candidates {
            if self.try_continue(rest)? {
                return Ok(Some(*kind));
            }
        }
        Ok(None)
    }

    /// Consume `expect` exactly, or leave the stream untouched.
    fn try_continue(&mut self, expect: &str) -> Result<bool, Diagnostic> {
        let mut consumed = Vec::new();
        let mut matched = true;
        for want in expect.chars() {
            match self.get_char()? {
                Some(got) => {
                    consumed.push(got);
                    if got != want {
                        matched = false;
                        break;
                    }
                }
                None => {
                    matched = false;
                    break;
                }
            }
        }
        if !matched {
            for ch in consumed.into_iter().rev() {
                self.unget_char(ch)?;
            }
        }
        Ok(matched)
    }

    fn get_char(&mut self) -> Result<Option<char>, Diagnostic> {
        let ch = match self.pushback.pop() {
            Some(ch) => Some(ch),
            None => self.decode_char()?,
        };
        if ch == Some('\n') {
            self.line += 1;
        }
        Ok(ch)
    }

    fn unget_char(&mut self, ch: char) -> Result<(), Diagnostic> {
        if self.pushback.len() >= PUSHBACK_CAPACITY {
            return Err(Diagnostic::system("pushback buffer overflow"));
        }
        if ch == '\n' {
            self.line -= 1;
        }
        self.pushback.push(ch);
        Ok(())
    }

    fn decode_char(&mut self) -> Result<Option<char>, Diagnostic> {
        let Some(lead) = self.read_byte()? else {
            return Ok(None);
        };
        let (len, init) = match lead {
            0x00..=0x7F => return Ok(Some(lead as char)),
            b if b & 0xE0 == 0xC0 => (2, u32::from(b & 0x1F)),
            b if b & 0xF0 == 0xE0 => (3, u32::from(b & 0x0F)),
            b if b & 0xF8 == 0xF0 => (4, u32::from(b & 0x07)),
            b => {
                return Err(Diagnostic::lexical(
                    self.line,
                    format!("invalid UTF-8 lead byte 0x{b:02X}"),
                ));
            }
        };
        let mut code = init;
        for _ in 1..len {
            let next = self.read_byte()?.ok_or_else(|| {
                Diagnostic::lexical(self.line, "truncated UTF-8 sequence at end of file")
            })?;
            if next & 0xC0 != 0x80 {
                return Err(Diagnostic::lexical(
                    self.line,
                    format!("invalid UTF-8 continuation byte 0x{next:02X}"),
                ));
            }
            code = (code << 6) | u32::from(next & 0x3F);
        }
        char::from_u32(code)
            .map(Some)
            .ok_or_else(|| Diagnostic::lexical(self.line, format!("invalid code point U+{code:X}")))
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Diagnostic> {
        loop {
            match self.bytes.next() {
                None => return Ok(None),
                Some(Ok(b'\r')) => continue,
                Some(Ok(b)) => return Ok(Some(b)),
                Some(Err(err)) => {
                    return Err(Diagnostic::system(format!("failed to read source: {err}")));
                }
            }
        }
    }
}

fn unknown_keyword(prefix: &str, line: usize) -> Diagnostic {
    Diagnostic::lexical(line, format!("unknown keyword starting with `{prefix}`"))
}

/// Normalize the content of a `「…」` literal into an ASCII number, or `None`
/// when it is not purely numeric.
pub fn normalize_number(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut digits = 0usize;
    let mut dots = 0usize;
    for (i, ch) in raw.chars().enumerate() {
        match ch {
            '0'..='9' => {
                out.push(ch);
                digits += 1;
            }
            '０'..='９' => {
                let offset = ch as u32 - '０' as u32;
                out.push(char::from_digit(offset, 10)?);
                digits += 1;
            }
            '.' | '．' => {
                out.push('.');
                dots += 1;
            }
            '-' | '－' if i == 0 => out.push('-'),
            _ => return None,
        }
    }
    let body = out.strip_prefix('-').unwrap_or(&out);
    if digits == 0 || dots > 1 || body.starts_with('.') || body.ends_with('.') {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::{Lexer, PUSHBACK_CAPACITY, Token, TokenKind, normalize_number};
    use crate::frontend::diagnostic::DiagnosticKind;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source.as_bytes()).tokenize().expect("lex")
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_declaration_statement() {
        use TokenKind::*;
        assert_eq!(
            kinds("”A”を「5」で宣言する。"),
            vec![Variable, Wo, Number, Declare, Period, Eof]
        );
        let toks = lex("”数値”に「３．５」をたす。");
        assert_eq!(toks[0].text, "数値");
        assert_eq!(toks[2].kind, TokenKind::Number);
        assert_eq!(toks[2].text, "3.5");
        assert_eq!(toks[3].kind, TokenKind::Add);
    }

    #[test]
    fn keywords_sharing_a_prefix_backtrack_cleanly() {
        use TokenKind::*;
        assert_eq!(kinds("でわる"), vec![Div, Eof]);
        assert_eq!(kinds("で宣言する"), vec![Declare, Eof]);
        assert_eq!(kinds("ではなく"), vec![ElseIf, Eof]);
        assert_eq!(kinds("ではない"), vec![Else, Eof]);
        assert_eq!(kinds("をかける をひく を"), vec![Mul, Sub, Wo, Eof]);
        assert_eq!(kinds("より大きいか より小さいか"), vec![Gt, Lt, Eof]);
        assert_eq!(kinds("と出力する と一緒か と違うか"), vec![Output, Eq, Ne, Eof]);
        assert_eq!(kinds("から かつ または"), vec![Kara, And, Or, Eof]);
        assert_eq!(kinds("以上か 以下か"), vec![Ge, Le, Eof]);
    }

    #[test]
    fn particle_wo_is_followed_by_literal_without_losing_characters() {
        let toks = lex("を「たすけ」");
        assert_eq!(toks[0].kind, TokenKind::Wo);
        assert_eq!(toks[1].kind, TokenKind::PrintLit);
        assert_eq!(toks[1].text, "たすけ");
    }

    #[test]
    fn spacing_flags_are_attached_to_next_token() {
        let toks = lex("”A” を\n「1」　で宣言する");
        assert!(toks[0].is_glued());
        assert!(toks[1].space_before && !toks[1].newline_before);
        assert!(toks[2].newline_before);
        assert!(toks[3].space_before, "full-width space counts as space");
        assert_eq!(toks[2].line, 2);
    }

    #[test]
    fn comments_are_skipped_and_set_flags() {
        let toks = lex("メイン＃ここはコメント\n｛＄一行＄｝＄複数\n行＄\n。");
        let ks: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            ks,
            vec![
                TokenKind::Main,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Period,
                TokenKind::Eof
            ]
        );
        assert!(toks[1].space_before && !toks[1].newline_before);
        assert!(toks[2].space_before && !toks[2].newline_before);
        assert!(toks[3].newline_before);
        assert_eq!(toks[1].line, 2);
        assert_eq!(toks[3].line, 4);
    }

    #[test]
    fn block_comment_does_not_eat_following_token() {
        let toks = lex("＄c＄。");
        assert_eq!(toks[0].kind, TokenKind::Period);
        assert!(toks[0].space_before);
    }

    #[test]
    fn unterminated_variable_is_lexical_error() {
        let err = Lexer::new("”A\nを".as_bytes()).tokenize().expect_err("must fail");
        assert_eq!(err.kind, DiagnosticKind::Lexical);
        assert_eq!(err.line, Some(1));
        let err = Lexer::new("「abc".as_bytes()).tokenize().expect_err("must fail");
        assert_eq!(err.kind, DiagnosticKind::Lexical);
    }

    #[test]
    fn unknown_characters_are_rejected() {
        let err = Lexer::new("\n\nx".as_bytes()).tokenize().expect_err("must fail");
        assert_eq!(err.kind, DiagnosticKind::Lexical);
        assert_eq!(err.line, Some(3));
        assert!(err.message.contains('x'));
        let err = Lexer::new("で 宣言する".as_bytes()).tokenize().expect_err("must fail");
        assert!(err.message.contains("`で`"), "{}", err.message);
        let err = Lexer::new("よりも".as_bytes()).tokenize().expect_err("must fail");
        assert!(err.message.contains("`より`"), "{}", err.message);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bytes: &[u8] = &[0xE3, 0x81];
        let err = Lexer::new(bytes).tokenize().expect_err("truncated");
        assert_eq!(err.kind, DiagnosticKind::Lexical);
        let bytes: &[u8] = &[0xFF];
        assert!(Lexer::new(bytes).tokenize().is_err());
    }

    #[test]
    fn carriage_returns_are_ignored() {
        let toks = lex("メイン\r\n｛｝");
        assert_eq!(toks[1].kind, TokenKind::LBrace);
        assert_eq!(toks[1].line, 2);
    }

    #[test]
    fn line_counter_is_symmetric_under_pushback() {
        let mut lexer = Lexer::new("\n\nA".as_bytes());
        assert_eq!(lexer.get_char().expect("read"), Some('\n'));
        assert_eq!(lexer.get_char().expect("read"), Some('\n'));
        assert_eq!(lexer.line(), 3);
        lexer.unget_char('\n').expect("unget");
        lexer.unget_char('\n').expect("unget");
        assert_eq!(lexer.line(), 1);
        assert_eq!(lexer.get_char().expect("read"), Some('\n'));
        assert_eq!(lexer.line(), 2);
    }

    #[test]
    fn pushback_overflow_is_system_error() {
        let mut lexer = Lexer::new("".as_bytes());
        for _ in 0..PUSHBACK_CAPACITY {
            lexer.unget_char('あ').expect("within capacity");
        }
        let err = lexer.unget_char('あ').expect_err("overflow");
        assert_eq!(err.kind, DiagnosticKind::System);
        assert_eq!(err.line, None);
    }

    #[test]
    fn eof_token_repeats() {
        let mut lexer = Lexer::new("".as_bytes());
        assert_eq!(lexer.next_token().expect("eof").kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().expect("eof").kind, TokenKind::Eof);
    }

    #[test]
    fn numeric_classification_boundaries() {
        assert_eq!(normalize_number("12.5").as_deref(), Some("12.5"));
        assert_eq!(normalize_number("１２．５").as_deref(), Some("12.5"));
        assert_eq!(normalize_number("-3").as_deref(), Some("-3"));
        assert_eq!(normalize_number("－4.0").as_deref(), Some("-4.0"));
        assert_eq!(normalize_number("007").as_deref(), Some("007"));
        assert_eq!(normalize_number(".5"), None);
        assert_eq!(normalize_number("5."), None);
        assert_eq!(normalize_number("-.5"), None);
        assert_eq!(normalize_number("1.2.3"), None);
        assert_eq!(normalize_number("-"), None);
        assert_eq!(normalize_number("3-"), None);
        assert_eq!(normalize_number("--3"), None);
        assert_eq!(normalize_number("1a"), None);
        assert_eq!(normalize_number(""), None);
        assert_eq!(normalize_number("1 2"), None);
    }
}
