use std::error::Error;
use std::fs::File;

use prettytable as pt;
use prettytable::cell;
use prettytable::row;

use lrtide_core::Automaton;

pub fn print_table(automaton: &Automaton) {
    let pretty_table = generate_pretty_table(automaton);
    println!("{}", pretty_table);
}

pub fn write_table_csv(automaton: &Automaton, csv_filename: &str) -> Result<(), Box<dyn Error>> {
    let pretty_table = generate_pretty_table(automaton);
    let csv_file = File::create(csv_filename)?;
    pretty_table.to_csv(csv_file)?;
    Ok(())
}

fn generate_pretty_table(automaton: &Automaton) -> pt::Table {
    let grammar = automaton.grammar;
    let table = automaton.table();
    let mut pretty_table = pt::Table::new();

    // Only symbols that appear in some transition get a column
    let mut columns: Vec<usize> = table
        .states
        .iter()
        .flat_map(|state| state.go_to.iter().map(|(sym, _)| *sym))
        .collect();
    columns.sort();
    columns.dedup();

    let mut title_row = row!["#", "Item closure", "Reduce", "Flags"];
    for sym in columns.iter() {
        title_row.add_cell(cell!(grammar.name(*sym)));
    }
    pretty_table.add_row(title_row);

    for (idx, (state, row_data)) in automaton.states.iter().zip(table.states.iter()).enumerate() {
        let items: Vec<String> = state
            .closure
            .keys()
            .iter()
            .map(|item| item.describe(grammar))
            .collect();
        let reduce = row_data
            .reduce_prod
            .map_or(String::new(), |prod| format!("r{} ({})", prod, row_data.reduce_size));

        let mut flags = Vec::new();
        if row_data.starts_line {
            flags.push("starts line".to_owned());
        }
        if row_data.newline_only {
            flags.push("newline only".to_owned());
        }
        if row_data.min_prefix > 0 {
            flags.push(format!("min prefix {}", row_data.min_prefix));
        }

        let mut row = row![idx, items.join("\n"), reduce, flags.join("\n")];
        for sym in columns.iter() {
            let cell = state.goto(*sym).map_or(String::new(), |target| {
                if grammar.is_terminal(*sym) {
                    format!("s{}", target)
                } else {
                    format!("{}", target)
                }
            });
            row.add_cell(cell!(cell));
        }
        pretty_table.add_row(row);
    }

    pretty_table
}
