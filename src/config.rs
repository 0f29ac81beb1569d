//! Memory configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clog2;
use crate::error::{Error, Result};

/// The smallest number of rows a bank may have.
pub const MIN_ROWS: usize = 16;

#[derive(Debug, Eq, PartialEq, Clone, Hash, Serialize, Deserialize)]
pub struct SramConfig {
    pub word_size: usize,
    pub num_words: usize,
    /// Column mux ratio.
    pub words_per_row: usize,
    #[serde(default = "default_num_banks")]
    pub num_banks: usize,
}

fn default_num_banks() -> usize {
    1
}

pub fn parse_sram_config(path: impl AsRef<Path>) -> Result<SramConfig> {
    let contents = fs::read_to_string(path)?;
    let data = toml::from_str(&contents)?;
    Ok(data)
}

/// How an address splits into bank, row and column fields.
///
/// The low `col_bits` select a word within a row, the next `row_bits` select
/// a row, and the top `bank_bits` select a bank.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AddressLayout {
    pub addr_bits: usize,
    pub bank_bits: usize,
    pub row_bits: usize,
    pub col_bits: usize,
    /// Rows per bank.
    pub rows: usize,
    /// Bitcell columns per bank.
    pub cols: usize,
}

impl SramConfig {
    pub fn address_layout(&self) -> Result<AddressLayout> {
        let invalid = |msg: String| Err(Error::InvalidParams(msg));
        for (what, x) in [
            ("word size", self.word_size),
            ("number of words", self.num_words),
            ("words per row", self.words_per_row),
        ] {
            if x == 0 || !x.is_power_of_two() {
                return invalid(format!("{what} must be a nonzero power of two, got {x}"));
            }
        }
        if ![1, 2, 4].contains(&self.num_banks) {
            return invalid(format!(
                "unsupported number of banks: {} (expected 1, 2 or 4)",
                self.num_banks
            ));
        }

        let words_per_bank = self.num_words / self.num_banks;
        if words_per_bank * self.num_banks != self.num_words
            || words_per_bank % self.words_per_row != 0
        {
            return invalid(format!(
                "{} words do not divide into {} bank(s) of {}-word rows",
                self.num_words, self.num_banks, self.words_per_row
            ));
        }
        let rows = words_per_bank / self.words_per_row;
        if rows < MIN_ROWS {
            return invalid(format!(
                "{rows} rows per bank is below the minimum of {MIN_ROWS}"
            ));
        }

        let layout = AddressLayout {
            addr_bits: clog2(self.num_words),
            bank_bits: clog2(self.num_banks),
            row_bits: clog2(rows),
            col_bits: clog2(self.words_per_row),
            rows,
            cols: self.word_size * self.words_per_row,
        };
        debug_assert_eq!(
            layout.addr_bits,
            layout.bank_bits + layout.row_bits + layout.col_bits
        );
        Ok(layout)
    }
}
