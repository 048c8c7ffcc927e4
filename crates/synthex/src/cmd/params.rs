use serde::Serialize;
use synthex_codec::{controller_for, ParameterKind, GLOBALS, PARAMETERS};

use crate::cmd::ParamsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct ParameterRow {
    name: &'static str,
    offset: usize,
    min: u8,
    max: u8,
    default: u8,
    kind: ParameterKind,
    controller: u8,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    labels: &'static [&'static str],
}

#[derive(Serialize)]
struct GlobalRow {
    name: &'static str,
    offset: usize,
    min: u8,
    max: u8,
    default: u8,
}

pub fn run(args: ParamsArgs, format: OutputFormat) -> CliResult<i32> {
    if args.globals {
        print_globals(format);
    } else {
        print_parameters(format);
    }
    Ok(SUCCESS)
}

fn print_parameters(format: OutputFormat) {
    let rows: Vec<ParameterRow> = PARAMETERS
        .iter()
        .map(|spec| ParameterRow {
            name: spec.name,
            offset: spec.offset,
            min: spec.min,
            max: spec.max,
            default: spec.default,
            kind: spec.kind,
            controller: controller_for(spec.id),
            labels: spec.labels,
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table =
                new_table(vec!["NAME", "OFFSET", "RANGE", "DEFAULT", "KIND", "CC"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.offset.to_string(),
                    format!("{}-{}", row.min, row.max),
                    row.default.to_string(),
                    kind_name(row.kind).to_string(),
                    row.controller.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "{:<16} offset={:<3} range={}-{} default={} cc={}",
                    row.name, row.offset, row.min, row.max, row.default, row.controller
                );
            }
        }
    }
}

fn kind_name(kind: ParameterKind) -> &'static str {
    match kind {
        ParameterKind::Amount => "amount",
        ParameterKind::ModSource => "mod_source",
        ParameterKind::Contained => "contained",
    }
}

fn print_globals(format: OutputFormat) {
    let rows: Vec<GlobalRow> = GLOBALS
        .iter()
        .map(|spec| GlobalRow {
            name: spec.name,
            offset: spec.offset,
            min: spec.min,
            max: spec.max,
            default: spec.default,
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = new_table(vec!["NAME", "OFFSET", "RANGE", "DEFAULT"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.offset.to_string(),
                    format!("{}-{}", row.min, row.max),
                    row.default.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "{:<16} offset={} range={}-{} default={}",
                    row.name, row.offset, row.min, row.max, row.default
                );
            }
        }
    }
}
