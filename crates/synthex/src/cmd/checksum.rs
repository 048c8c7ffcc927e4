use serde::Serialize;
use synthex_frame::{compute_complement7, compute_mask7};

use crate::cmd::ChecksumArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ChecksumReport {
    length: usize,
    sum: u32,
    mask7: u8,
    complement7: u8,
}

impl ChecksumReport {
    fn new(bytes: &[u8]) -> Self {
        Self {
            length: bytes.len(),
            sum: bytes.iter().map(|&b| u32::from(b)).sum(),
            mask7: compute_mask7(bytes),
            complement7: compute_complement7(bytes),
        }
    }
}

pub fn run(args: ChecksumArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_bytes(&args.bytes, args.decimal)?;
    let report = ChecksumReport::new(&bytes);

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["VARIANT", "HEX", "DECIMAL"]);
            table.add_row(vec![
                "mask7".to_string(),
                format!("{:#04x}", report.mask7),
                report.mask7.to_string(),
            ]);
            table.add_row(vec![
                "complement7".to_string(),
                format!("{:#04x}", report.complement7),
                report.complement7.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "length={} sum={} mask7={:#04x} ({}) complement7={:#04x} ({})",
            report.length,
            report.sum,
            report.mask7,
            report.mask7,
            report.complement7,
            report.complement7
        ),
    }
    Ok(SUCCESS)
}

fn parse_bytes(args: &[String], decimal: bool) -> CliResult<Vec<u8>> {
    let mut bytes = Vec::new();
    for arg in args {
        for token in arg
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
        {
            if decimal {
                let value = token
                    .parse::<u8>()
                    .map_err(|_| CliError::new(USAGE, format!("invalid decimal byte: {token}")))?;
                bytes.push(value);
                continue;
            }
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            if digits.is_empty() || digits.len() % 2 != 0 {
                return Err(CliError::new(
                    USAGE,
                    format!("hex token must have an even number of digits: {token}"),
                ));
            }
            for pair in digits.as_bytes().chunks(2) {
                let pair = std::str::from_utf8(pair).unwrap_or("");
                let value = u8::from_str_radix(pair, 16)
                    .map_err(|_| CliError::new(USAGE, format!("invalid hex byte in {token}")))?;
                bytes.push(value);
            }
        }
    }
    Ok(bytes)
}
