use std::error::Error;
use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

use lrtide_core::Automaton;

pub fn write_graphviz_graph(
    automaton: &Automaton,
    output_filename: &str,
) -> Result<(), Box<dyn Error>> {
    let graphviz_string = render_graphviz_graph(automaton);
    fs::write(output_filename, graphviz_string)?;
    Ok(())
}

pub fn show_graphviz_graph(automaton: &Automaton) -> Result<(), Box<dyn Error>> {
    let graphviz_string = render_graphviz_graph(automaton);
    // The viewer is picked by extension, so the file needs to end in .dot
    let mut temp_file = NamedTempFile::new()?;
    let path = temp_file.path().with_extension("dot");
    write!(temp_file, "{}", graphviz_string)?;
    temp_file.persist(&path)?;
    open::that(&path)?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_graphviz_graph(automaton: &Automaton) -> String {
    let grammar = automaton.grammar;
    let mut lines = Vec::new();
    lines.push(format!("digraph {}_states {{", automaton.strength));
    for (state_idx, state) in automaton.states.iter().enumerate() {
        let table_rows: Vec<String> = state
            .closure
            .iter()
            .map(|(item, handle)| {
                let mut item_string = escape(&item.describe(grammar));
                if state.kernel.contains(item) {
                    item_string = format!("<B>{}</B>", item_string);
                }
                let lookahead: Vec<&str> = if item.is_complete(grammar) {
                    automaton
                        .reduce_lookahead(*item, *handle)
                        .keys()
                        .iter()
                        .map(|sym| grammar.name(*sym))
                        .collect()
                } else {
                    Vec::new()
                };
                let mut la_string = escape(&lookahead.join(" "));
                if Some(item.prod) == state.reduce {
                    // Underline marks the reduction the runtime will use
                    la_string = format!("<U>{}</U>", la_string);
                }
                format!(
                    "      <TR><TD>{}</TD><TD>{}</TD></TR>",
                    item_string, la_string
                )
            })
            .collect();
        let table_head = format!(
            "      <TR><TD><B>State #{}</B></TD><TD><B>Lookahead</B></TD></TR>",
            state_idx
        );
        lines.push(format!(
            r#"  State{} [shape=plain label=<
    <TABLE BORDER="0" CELLBORDER="1" CELLSPACING="0">
{}
{}
    </TABLE>
  >];"#,
            state_idx,
            table_head,
            table_rows.join("\n")
        ));
        for (sym, target) in state.go_to.iter() {
            lines.push(format!(
                r#"  State{} -> State{} [label="{}"];"#,
                state_idx,
                target,
                escape(grammar.name(*sym))
            ));
        }
    }
    lines.push("}".to_owned());
    lines.join("\n")
}
