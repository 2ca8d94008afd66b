//! Stack-safe parsing utilities
//!
//! Object bodies nest arbitrarily deep in hostile files. Every nested body
//! read goes through a [`RecursionGuard`], which counts nesting levels on the
//! parser and refuses to go past the configured limit. Speculative reads go
//! through a [`PositionGuard`], which puts the cursor back unless the caller
//! commits to what was read.

use super::lexer::SyntaxParser;
use super::{ParseError, ParseResult};
use crate::source::ByteSource;
use std::ops::{Deref, DerefMut};

/// Maximum nesting depth for PDF object bodies
pub const MAX_RECURSION_DEPTH: usize = 1024;

/// RAII guard for recursion depth tracking
pub struct RecursionGuard<'a, S: ByteSource> {
    parser: &'a mut SyntaxParser<S>,
}

impl<'a, S: ByteSource> RecursionGuard<'a, S> {
    /// Enter one nesting level, failing once the limit is exceeded
    pub fn enter(parser: &'a mut SyntaxParser<S>) -> ParseResult<Self> {
        let limit = parser.options.max_recursion_depth;
        if parser.depth >= limit {
            tracing::warn!(
                "Maximum recursion depth {} reached at position {}",
                limit,
                parser.pos
            );
            return Err(ParseError::RecursionLimit(limit));
        }
        parser.depth += 1;
        Ok(Self { parser })
    }
}

impl<S: ByteSource> Deref for RecursionGuard<'_, S> {
    type Target = SyntaxParser<S>;

    fn deref(&self) -> &Self::Target {
        self.parser
    }
}

impl<S: ByteSource> DerefMut for RecursionGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.parser
    }
}

impl<S: ByteSource> Drop for RecursionGuard<'_, S> {
    fn drop(&mut self) {
        self.parser.depth -= 1;
    }
}

/// RAII guard that restores the cursor on drop
pub struct PositionGuard<'a, S: ByteSource> {
    parser: &'a mut SyntaxParser<S>,
    saved: u64,
    restore: bool,
}

impl<'a, S: ByteSource> PositionGuard<'a, S> {
    pub fn new(parser: &'a mut SyntaxParser<S>) -> Self {
        let saved = parser.pos;
        Self {
            parser,
            saved,
            restore: true,
        }
    }

    /// Keep the cursor where it is when the guard is dropped
    pub fn abandon(&mut self) {
        self.restore = false;
    }

    pub fn saved_pos(&self) -> u64 {
        self.saved
    }
}

impl<S: ByteSource> Deref for PositionGuard<'_, S> {
    type Target = SyntaxParser<S>;

    fn deref(&self) -> &Self::Target {
        self.parser
    }
}

impl<S: ByteSource> DerefMut for PositionGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.parser
    }
}

impl<S: ByteSource> Drop for PositionGuard<'_, S> {
    fn drop(&mut self) {
        if self.restore {
            self.parser.pos = self.saved;
        }
    }
}
