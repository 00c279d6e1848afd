// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Protocol about coefficients of biquad filter bank.
//!
//! The equalizer file is text. Each line consists of 1-based index and five coefficients of
//! biquad filter, separated by white spaces. The coefficients are converted to fixed point words
//! with exponent shared in the line, then delivered to the filter bank module of DSP.

use {
    super::*,
    dsp::*,
    memory::{serialize_words, BYTES_PER_WORD},
    tracing::debug,
};

/// The number of lines in equalizer.
pub const EQ_LINES: usize = 10;

/// The number of words for single line.
pub const EQ_LINE_WORDS: usize = 6;

/// The number of bytes for single line.
pub const EQ_LINE_SIZE: usize = EQ_LINE_WORDS * BYTES_PER_WORD;

/// The number of bytes for the whole equalizer.
pub const EQ_SIZE: usize = EQ_LINES * EQ_LINE_SIZE;

/// The coefficients of biquad filter which passes input through.
pub const EQ_BYPASS: [f32; 5] = [1.0, 0.0, 0.0, 0.0, 0.0];

const EQ_MAX_SPACE: i32 = 8;

fn format_error(msg: &str) -> Error {
    Error::new(Tfa9887Error::Format, msg)
}

/// Pack the coefficients of line into fixed point words. The line for bypass results in zeros.
pub fn pack_eq_line(coeffs: &[f32; 5]) -> Result<[u8; EQ_LINE_SIZE], Error> {
    let mut raw = [0; EQ_LINE_SIZE];

    if coeffs == &EQ_BYPASS {
        return Ok(raw);
    }

    let max = coeffs.iter().fold(0.0f32, |max, c| max.max(c.abs()));
    let space = (max as f64 + 2.0f64.powi(-23)).log2().ceil() as i32;
    if space > EQ_MAX_SPACE {
        let msg = format!(
            "The magnitude of coefficient {} requires {} bits for exponent",
            max, space
        );
        Err(format_error(&msg))?;
    }
    let space = space.max(0);

    let scale = (1 << (23 - space)) as f32;
    let words = [
        space,
        (-coeffs[4] * scale) as i32,
        (-coeffs[3] * scale) as i32,
        (coeffs[2] * scale) as i32,
        (coeffs[1] * scale) as i32,
        (coeffs[0] * scale) as i32,
    ];
    serialize_words(&words, &mut raw);

    Ok(raw)
}

/// Parse the content of equalizer file into the data for filter bank module. Lines fewer than
/// the bank has are left as zeros, and lines beyond it are ignored.
pub fn parse_eq(text: &str) -> Result<Vec<u8>, Error> {
    let mut data = vec![0; EQ_SIZE];
    let mut tokens = text.split_whitespace();

    for (i, chunk) in data.chunks_exact_mut(EQ_LINE_SIZE).enumerate() {
        let fields: Vec<&str> = tokens.by_ref().take(1 + 5).collect();
        if fields.is_empty() {
            break;
        } else if fields.len() < 1 + 5 {
            let msg = format!("Line {} should have 6 values but {}", i + 1, fields.len());
            Err(format_error(&msg))?;
        }

        let idx = fields[0].parse::<i32>().map_err(|e| {
            let msg = format!("Invalid index {} at line {}: {}", fields[0], i + 1, e);
            format_error(&msg)
        })?;
        if idx != i as i32 + 1 {
            let msg = format!("Index mismatch at line {}: {}", i + 1, idx);
            Err(format_error(&msg))?;
        }

        let mut coeffs = [0.0f32; 5];
        coeffs
            .iter_mut()
            .zip(&fields[1..])
            .try_for_each(|(coeff, field)| {
                field.parse::<f32>().map(|val| *coeff = val).map_err(|e| {
                    let msg = format!("Invalid coefficient {} at line {}: {}", field, i + 1, e);
                    format_error(&msg)
                })
            })?;

        chunk.copy_from_slice(&pack_eq_line(&coeffs)?);
    }

    Ok(data)
}

/// The trait for operation to configure equalizer.
pub trait Tfa9887EqualizerOperation: Tfa9887DspOperation {
    /// Deliver the content of equalizer file to filter bank module.
    fn load_eq(&mut self, text: &str) -> Result<(), Error> {
        let data = parse_eq(text)?;
        self.write_params(PARAM_SET_EQ, MODULE_BIQUADFILTERBANK, &data)
    }

    /// Deliver the equalizer file.
    fn load_eq_file(&mut self, path: &Path) -> Result<(), Error> {
        let raw = read_file(path)?;
        let text = String::from_utf8(raw).map_err(|e| {
            let msg = format!("{} is not text: {}", path.display(), e);
            format_error(&msg)
        })?;
        debug!(path = %path.display(), "equalizer");
        self.load_eq(&text)
    }
}

impl<O: Tfa9887DspOperation> Tfa9887EqualizerOperation for O {}
