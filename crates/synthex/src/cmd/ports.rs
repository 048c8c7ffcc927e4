use serde::Serialize;
use synthex_transport::{list_ports, PortList};

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct PortRow<'a> {
    direction: &'static str,
    index: usize,
    name: &'a str,
}

pub fn run(args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = list_ports(&args.client_name)
        .map_err(|err| transport_error("failed listing ports", err))?;
    let rows = rows(&ports);

    match format {
        OutputFormat::Json => {
            for row in &rows {
                print_json(row);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["DIRECTION", "#", "NAME"]);
            for row in &rows {
                table.add_row(vec![
                    row.direction.to_string(),
                    row.index.to_string(),
                    row.name.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if rows.is_empty() {
                println!("no midi ports found");
            }
            for row in &rows {
                println!("{:<6} {}: {}", row.direction, row.index, row.name);
            }
        }
    }
    Ok(SUCCESS)
}

fn rows(ports: &PortList) -> Vec<PortRow<'_>> {
    let inputs = ports.inputs.iter().enumerate().map(|(index, name)| PortRow {
        direction: "in",
        index,
        name,
    });
    let outputs = ports.outputs.iter().enumerate().map(|(index, name)| PortRow {
        direction: "out",
        index,
        name,
    });
    inputs.chain(outputs).collect()
}
