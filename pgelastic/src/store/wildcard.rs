//! Elasticsearch wildcard patterns (`*`, `?`) translated into SQL `LIKE` syntax

/// A `LIKE` pattern using backslash as the escape character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern(String);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    AnyRun,
    AnyOne,
    Literal(char),
}

impl LikePattern {
    /// Translate an Elasticsearch wildcard: `*` becomes `%`, `?` becomes `_`,
    /// and characters special to `LIKE` are escaped so they match literally.
    pub fn from_wildcard(pattern: &str) -> Self {
        let mut out = String::with_capacity(pattern.len() + 4);
        for c in pattern.chars() {
            match c {
                '*' => out.push('%'),
                '?' => out.push('_'),
                '%' | '_' | '\\' => {
                    out.push('\\');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        Self(out)
    }

    /// The pattern as handed to the backend's `LIKE` operator
    pub fn as_sql(&self) -> &str {
        &self.0
    }

    /// Evaluate `text LIKE pattern` the way PostgreSQL does (case-sensitive).
    pub fn matches(&self, text: &str) -> bool {
        let tokens = self.tokens();
        let text_chars: Vec<char> = text.chars().collect();

        let mut dp = vec![vec![false; text_chars.len() + 1]; tokens.len() + 1];
        dp[0][0] = true;

        for (i, token) in tokens.iter().enumerate() {
            if *token == Token::AnyRun {
                dp[i + 1][0] = dp[i][0];
            }
        }

        for (i, token) in tokens.iter().enumerate() {
            for (j, &t) in text_chars.iter().enumerate() {
                dp[i + 1][j + 1] = match token {
                    Token::AnyRun => dp[i][j + 1] || dp[i + 1][j],
                    Token::AnyOne => dp[i][j],
                    Token::Literal(c) => *c == t && dp[i][j],
                };
            }
        }

        dp[tokens.len()][text_chars.len()]
    }

    fn tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(self.0.len());
        let mut chars = self.0.chars();
        while let Some(c) = chars.next() {
            tokens.push(match c {
                '%' => Token::AnyRun,
                '_' => Token::AnyOne,
                // A trailing lone backslash matches itself
                '\\' => Token::Literal(chars.next().unwrap_or('\\')),
                c => Token::Literal(c),
            });
        }
        tokens
    }
}
