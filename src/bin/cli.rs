#![cfg(not(tarpaulin_include))]

use prodlog::downloader;
use prodlog::entry::EntryField;
use prodlog::export::{ExportPayload, export_filename};
use prodlog::form::{HeaderField, ProductionForm};
use prodlog::saving;
use prodlog::specs::SpecField;
use prodlog::summary::FormSummary;

use std::io::{self, Write};
use std::time::Instant;

fn display(form: &ProductionForm) {
    println!(
        "{} | site: {} | date: {} | shift: {} | operator: {} | line: {} | WO: {}",
        form.display_name(0),
        form.production_site,
        form.date,
        form.shift,
        form.operator_name,
        form.production_line,
        form.work_order_number
    );
    let specs = &form.target_specs;
    println!(
        "targets {}: OD {} [{}..{}] wall [{}..{}] theo wt/ft {}",
        if specs.is_complete() { "complete" } else { "INCOMPLETE" },
        specs.od_average,
        specs.od_min,
        specs.od_max,
        specs.wall_min,
        specs.wall_max,
        specs.theo_wt_per_ft
    );

    println!(
        "{:>3} {:>5} {:>5} {:>7} {:>7} {:>7} {:>6} {:>7} {:>7} {:>7} {:>6} {:>6} {:>9} {:>6}",
        "#", "start", "end", "odAvg", "odMax", "odMin", "OOR", "oval", "toeIn", "ecc", "gain", "loss", "units", "state"
    );
    for (i, view) in form.entry_views().iter().enumerate() {
        let e = view.entry;
        let m = &view.metrics;
        println!(
            "{:>3} {:>5} {:>5} {:>7} {:>7} {:>7} {:>6.3} {:>7.3} {:>7.3} {:>7.3} {:>6.2} {:>6.2} {:>9} {:>6}",
            i,
            e.start,
            e.end,
            e.od_average.to_string(),
            e.od_maximum.to_string(),
            e.od_minimum.to_string(),
            m.out_of_round,
            m.ovality,
            m.toe_in,
            m.eccentricity,
            m.gain,
            m.loss,
            format!("{}-{}", e.unit_start, e.unit_end),
            if view.locked { "locked" } else { "open" }
        );
    }

    let summary = FormSummary::compute(form);
    println!(
        "accepted {} lbs / {} ft, scrap {} lbs / {} ft, units {}, completed rows {}",
        summary.accepted_lbs,
        summary.accepted_fts,
        summary.scrap_lbs,
        summary.scrap_fts,
        summary.total_units,
        summary.completed_entries
    );
}

fn print_help() {
    println!("Commands:");
    println!("  show: Print the form");
    println!("  header <field> <value>: Set a header field (e.g. shift A)");
    println!("  spec <field> <value>: Set a target limit (number, '-' or empty)");
    println!("  scan <payload>: Apply a scanned '*^' label");
    println!("  set <row> <field> <value>: Set a field of a row");
    println!("  add: Add a row");
    println!("  remove <row> [yes]: Remove a row; 'yes' confirms rows with data");
    println!("  export [path]: Write the JSON export");
    println!("  csv <path>: Write the rows as CSV");
    println!("  xlsx <path>: Write the rows as XLSX");
    println!("  save <path>: Save a draft");
    println!("  load <path>: Load a draft");
    println!("  q: Quit");
}

fn run_command(form: &mut ProductionForm, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let mut parts = command.splitn(2, ' ');
    let verb = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match verb {
        "header" => {
            let (field, value) = rest.split_once(' ').unwrap_or((rest, ""));
            form.set_header_field(HeaderField::from_name(field)?, value)?;
        }
        "spec" => {
            let (field, value) = rest.split_once(' ').unwrap_or((rest, ""));
            let field = SpecField::from_name(field).ok_or("unknown target field")?;
            form.target_specs.set_from_input(field, value)?;
        }
        "scan" => form.apply_qr_payload(rest)?,
        "set" => {
            let mut args = rest.splitn(3, ' ');
            let row: usize = args.next().unwrap_or("").parse()?;
            let field = EntryField::from_name(args.next().unwrap_or(""))?;
            form.edit_entry(row, field, args.next().unwrap_or(""))?;
        }
        "add" => {
            let row = form.add_entry()?;
            return Ok(format!("row {} added", row));
        }
        "remove" => {
            let mut args = rest.split_whitespace();
            let row: usize = args.next().unwrap_or("").parse()?;
            let confirmed = args.next() == Some("yes");
            form.remove_entry(row, confirmed)?;
        }
        "export" => {
            let path = if rest.is_empty() {
                export_filename(form)
            } else {
                rest.to_string()
            };
            std::fs::write(&path, ExportPayload::new(form).to_json_pretty()?)?;
            return Ok(format!("wrote {}", path));
        }
        "csv" => std::fs::write(rest, downloader::to_csv(form)?)?,
        "xlsx" => std::fs::write(rest, downloader::to_xlsx(form)?)?,
        "save" => saving::save_form(form, rest)?,
        "load" => *form = saving::load_form(rest)?,
        _ => return Err("invalid command".into()),
    }
    Ok(String::from("ok"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let s = Instant::now();
    let mut form = ProductionForm::new("form-1");
    let mut start_time = Instant::now();
    let mut status = String::from("ok");
    let mut show = true;

    loop {
        if show {
            display(&form);
        }

        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();
        start_time = Instant::now();

        match command {
            "" => {
                status = String::from("invalid command");
                show = false;
            }
            "q" => break,
            "help" => {
                print_help();
                show = false;
            }
            "show" => show = true,
            _ => {
                status = match run_command(&mut form, command) {
                    Ok(message) => message,
                    Err(e) => e.to_string(),
                };
                show = true;
            }
        }
    }

    println!("Total elapsed time: {:.1} seconds", s.elapsed().as_secs_f64());
    Ok(())
}
