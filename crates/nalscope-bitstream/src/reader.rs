//! Symbol reader: decodes symbols and logs each one into a syntax tree
//!
//! Every read validates the decoded value against the configured
//! [`Options`], then appends a node under the current tree level. A failed
//! check still produces the (flagged) symbol node; every failure then adds
//! an `Error` node and is wrapped in [`BitstreamError::Read`], so a partial
//! trace is always available.

use crate::bits::{BitCursor, BitPosition};
use crate::check::Options;
use crate::error::{BitstreamError, Result};
use crate::tree::{NodeId, SyntaxNode, SyntaxTree};

/// Coding descriptor for a symbol of `bits` raw bits
fn format_coding(format: &str, bits: usize) -> String {
    if format == "u(1)" {
        format.to_string()
    } else {
        format!("{} -> u({})", format, bits)
    }
}

/// Decoding surface used by all syntax element parsers
pub struct SymbolReader<'t> {
    cursor: BitCursor,
    tree: Option<&'t mut SyntaxTree>,
    levels: Vec<NodeId>,
}

impl SymbolReader<'static> {
    /// A reader that validates but logs nothing
    pub fn new(cursor: BitCursor) -> Self {
        Self {
            cursor,
            tree: None,
            levels: Vec::new(),
        }
    }
}

impl<'t> SymbolReader<'t> {
    /// A reader logging under `anchor`, optionally inside a new group `level`
    pub fn with_tree(
        cursor: BitCursor,
        tree: &'t mut SyntaxTree,
        anchor: NodeId,
        level: Option<&str>,
    ) -> Self {
        let root = match level {
            Some(name) if !name.is_empty() => tree.add_group(anchor, name),
            _ => anchor,
        };
        Self {
            cursor,
            tree: Some(tree),
            levels: vec![root],
        }
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.cursor.is_byte_aligned()
    }

    pub fn position(&self) -> BitPosition {
        self.cursor.position()
    }

    pub fn bits_left(&self) -> usize {
        self.cursor.bits_left()
    }

    pub fn cursor(&self) -> &BitCursor {
        &self.cursor
    }

    /// The tree node new symbols are currently attached to
    pub fn current_level(&self) -> Option<NodeId> {
        self.levels.last().copied()
    }

    /// Set the value text of the current level node
    pub fn describe_level(&mut self, value: impl Into<String>) {
        if let (Some(tree), Some(&level)) = (self.tree.as_deref_mut(), self.levels.last()) {
            tree.node_mut(level).value = value.into();
        }
    }

    /// Open a nested group; symbols are logged inside it until [`Self::exit_sub_level`]
    pub fn enter_sub_level(&mut self, name: &str) {
        debug_assert!(!name.is_empty());
        let Some(tree) = self.tree.as_deref_mut() else {
            return;
        };
        let Some(&parent) = self.levels.last() else {
            return;
        };
        let level = tree.add_group(parent, name);
        self.levels.push(level);
    }

    /// Close the innermost group; the root level is never closed
    pub fn exit_sub_level(&mut self) {
        if self.levels.len() <= 1 {
            return;
        }
        self.levels.pop();
    }

    pub fn read_flag(&mut self, name: &str, options: &Options) -> Result<bool> {
        match self.cursor.read_bits(1) {
            Ok((value, code)) => {
                self.check_and_log("u(1)", name, options, value as i64, value.to_string(), code)
                    .map_err(|e| self.log_error(e, format!("flag {}", name)))?;
                Ok(value != 0)
            }
            Err(e) => Err(self.log_error(e, format!("flag {}", name))),
        }
    }

    pub fn read_bits(&mut self, name: &str, n: usize, options: &Options) -> Result<u64> {
        match self.cursor.read_bits(n) {
            Ok((value, code)) => {
                let format = if n == 1 { "u(1)" } else { "u(v)" };
                let checked = i64::try_from(value).unwrap_or(i64::MAX);
                self.check_and_log(format, name, options, checked, value.to_string(), code)
                    .map_err(|e| self.log_error(e, format!("{} bit symbol {}", n, name)))?;
                Ok(value)
            }
            Err(e) => Err(self.log_error(e, format!("{} bit symbol {}", n, name))),
        }
    }

    pub fn read_ue(&mut self, name: &str, options: &Options) -> Result<u64> {
        match self.cursor.read_ue() {
            Ok((value, code)) => {
                let checked = i64::try_from(value).unwrap_or(i64::MAX);
                self.check_and_log("ue(v)", name, options, checked, value.to_string(), code)
                    .map_err(|e| self.log_error(e, format!("UEV symbol {}", name)))?;
                Ok(value)
            }
            Err(e) => Err(self.log_error(e, format!("UEV symbol {}", name))),
        }
    }

    /// `ue(v)` for elements stored as `u32`; larger code numbers fail the range check
    pub fn read_ue_u32(&mut self, name: &str, options: &Options) -> Result<u32> {
        let bounded = options.clone().with_max(i64::from(u32::MAX));
        let value = self.read_ue(name, &bounded)?;
        u32::try_from(value).map_err(|_| BitstreamError::SemanticRange {
            symbol: name.to_string(),
            message: format!("Value {} does not fit in 32 bits", value),
        })
    }

    pub fn read_se(&mut self, name: &str, options: &Options) -> Result<i64> {
        match self.cursor.read_se() {
            Ok((value, code)) => {
                self.check_and_log("se(v)", name, options, value, value.to_string(), code)
                    .map_err(|e| self.log_error(e, format!("SEV symbol {}", name)))?;
                Ok(value)
            }
            Err(e) => Err(self.log_error(e, format!("SEV symbol {}", name))),
        }
    }

    /// Read a block of bytes. No range checks apply; only the fixed meaning is logged.
    pub fn read_bytes(&mut self, name: &str, n: usize, options: &Options) -> Result<Vec<u8>> {
        match self.cursor.read_bytes(n) {
            Ok((bytes, code)) => {
                self.log_bytes(name, options, &bytes, &code)?;
                Ok(bytes)
            }
            Err(e) => Err(self.log_error(e, format!("{} bytes {}", n, name))),
        }
    }

    fn check_and_log(
        &mut self,
        format: &str,
        name: &str,
        options: &Options,
        value: i64,
        display: String,
        code: String,
    ) -> Result<()> {
        let result = options.validate(value);

        if let (Some(tree), Some(&level)) = (self.tree.as_deref_mut(), self.levels.last()) {
            let mut meaning = options.meaning_for(value);
            if !result.passed {
                if !meaning.is_empty() {
                    meaning.push(' ');
                }
                meaning.push_str(&result.message);
            }
            let coding = format_coding(format, code.len());
            let mut node = SyntaxNode::symbol(name, display, coding, code, meaning);
            node.error = !result.passed;
            tree.add_child(level, node);
        }

        if result.passed {
            Ok(())
        } else {
            Err(BitstreamError::SemanticRange {
                symbol: name.to_string(),
                message: result.message,
            })
        }
    }

    fn log_bytes(&mut self, name: &str, options: &Options, bytes: &[u8], code: &str) -> Result<()> {
        let Some(tree) = self.tree.as_deref_mut() else {
            return Ok(());
        };
        let Some(&level) = self.levels.last() else {
            return Ok(());
        };
        if code.len() != bytes.len() * 8 {
            return Err(BitstreamError::SizeMismatch {
                bytes: bytes.len(),
                bits: code.len(),
            });
        }

        let block = tree.add_child(
            level,
            SyntaxNode::symbol(
                name,
                format!("{} bytes", bytes.len()),
                format_coding("u(v)", code.len()),
                code,
                options.meaning.clone(),
            ),
        );
        for (i, byte) in bytes.iter().enumerate() {
            tree.add_child(
                block,
                SyntaxNode::symbol(
                    format!("Byte {}", i),
                    format!("0x{:02x} ({})", byte, byte),
                    format_coding("u(v)", 8),
                    &code[i * 8..i * 8 + 8],
                    options.meaning.clone(),
                ),
            );
        }
        Ok(())
    }

    fn log_error(&mut self, error: BitstreamError, when: String) -> BitstreamError {
        if let (Some(tree), Some(&level)) = (self.tree.as_deref_mut(), self.levels.last()) {
            tree.add_child(
                level,
                SyntaxNode::symbol("Error", "", "", "", format!("Reading error {}", error))
                    .with_error(),
            );
        }
        BitstreamError::Read {
            context: when,
            source: Box::new(error),
        }
    }
}
