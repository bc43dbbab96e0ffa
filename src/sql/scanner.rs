// FROM clause scanner - walks table declarations character by character

/// Cursor over the FROM clause text.
///
/// Join conditions are handed to the expression parser as raw text, so the
/// scanner exposes its position instead of producing a token stream.
pub struct FromScanner {
    chars: Vec<char>,
    position: usize,
}

impl FromScanner {
    pub fn new(input: &str) -> Self {
        FromScanner {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    pub fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    pub fn advance(&mut self) {
        self.position += 1;
    }

    /// Skips `count` characters.
    pub fn advance_by(&mut self, count: usize) {
        self.position = (self.position + count).min(self.chars.len());
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    pub fn is_at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.current_char().is_none()
    }

    /// Unconsumed input.
    pub fn rest(&self) -> String {
        self.chars[self.position..].iter().collect()
    }

    /// Consumes `ch` if it is the next non-space character.
    pub fn eat_char(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.current_char() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Next whitespace- or comma-delimited word, without consuming it.
    pub fn peek_word(&mut self) -> Option<String> {
        self.skip_whitespace();
        let word: String = self.chars[self.position..]
            .iter()
            .take_while(|c| !c.is_whitespace() && **c != ',')
            .collect();
        if word.is_empty() {
            None
        } else {
            Some(word)
        }
    }

    /// Consumes the next word if it equals `keyword`, ignoring case.
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek_word() {
            Some(word) if word.eq_ignore_ascii_case(keyword) => {
                self.advance_by(word.chars().count());
                true
            }
            _ => false,
        }
    }

    /// Reads a table locator: a double-quoted string (`""` escapes a quote)
    /// or a run of characters up to whitespace or a comma.
    pub fn read_locator(&mut self) -> Option<String> {
        self.skip_whitespace();
        if self.current_char() != Some('"') {
            let word = self.peek_word()?;
            self.advance_by(word.chars().count());
            return Some(word);
        }

        self.advance(); // opening quote
        let mut locator = String::new();
        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '"' {
                if self.current_char() == Some('"') {
                    locator.push('"');
                    self.advance();
                } else {
                    return Some(locator);
                }
            } else {
                locator.push(ch);
            }
        }
        // Unterminated quote
        None
    }
}
