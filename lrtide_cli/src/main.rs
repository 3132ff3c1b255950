use std::error::Error;
use std::fs;
use std::io;
use std::process;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use lrtide_core::Strength;
use lrtide_scan::{code_text, code_text_with_lines, TokenConfig, TokenKind, Tokenizer};

mod graphviz;
mod load;
mod run;
mod table;

use crate::load::Document;

fn main() {
    env_logger::init();
    if let Err(err) = cli() {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn file_arg() -> Arg<'static, 'static> {
    Arg::with_name("file")
        .help("Literate document containing the grammar")
        .required(true)
}

fn section_arg() -> Arg<'static, 'static> {
    Arg::with_name("section")
        .long("--section")
        .short("-s")
        .takes_value(true)
        .help("Code section to use (defaults to the first one)")
}

fn strength_arg() -> Arg<'static, 'static> {
    Arg::with_name("strength")
        .long("--strength")
        .takes_value(true)
        .possible_values(&["LR0", "LR05", "SLR", "LALR", "LR1"])
        .case_insensitive(true)
        .default_value("LALR")
        .help("Lookahead strength of the generated tables")
}

fn output_arg(help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name("output")
        .long("--output")
        .short("-o")
        .takes_value(true)
        .help(help)
}

fn cli() -> Result<(), Box<dyn Error>> {
    let matches = App::new("lrtide")
        .about("Tool for building layout-aware LR parsers from literate grammars")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(
            SubCommand::with_name("extract")
                .arg(file_arg())
                .arg(section_arg())
                .arg(
                    Arg::with_name("lines")
                        .long("--lines")
                        .help("Mark where the code came from in the document"),
                )
                .about("Prints the linearized code of a section"),
        )
        .subcommand(
            SubCommand::with_name("tokens")
                .arg(file_arg())
                .arg(section_arg())
                .about("Prints the tokens of a section"),
        )
        .subcommand(
            SubCommand::with_name("report")
                .arg(file_arg())
                .arg(section_arg())
                .arg(strength_arg())
                .about("Prints symbols, productions, FIRST/FOLLOW sets, states and conflicts"),
        )
        .subcommand(
            SubCommand::with_name("table")
                .arg(file_arg())
                .arg(section_arg())
                .arg(strength_arg())
                .arg(
                    Arg::with_name("csv")
                        .long("--csv")
                        .takes_value(true)
                        .help("Write the parse table to a specified CSV file"),
                )
                .about("Prints the parse table of a grammar"),
        )
        .subcommand(
            SubCommand::with_name("graph")
                .arg(file_arg())
                .arg(section_arg())
                .arg(strength_arg())
                .arg(output_arg(
                    "Write the generated graphviz graph to a file (*.dot)",
                ))
                .about("Outputs a graphviz graph showing the states of a grammar"),
        )
        .subcommand(
            SubCommand::with_name("generate")
                .arg(file_arg())
                .arg(section_arg())
                .arg(strength_arg())
                .arg(
                    Arg::with_name("header")
                        .long("--header")
                        .takes_value(true)
                        .help("Code section copied in front of the generated code"),
                )
                .arg(output_arg("Write the generated Rust code to a file"))
                .about("Generates Rust tables and actions for a grammar"),
        )
        .subcommand(
            SubCommand::with_name("parse")
                .arg(file_arg())
                .arg(
                    Arg::with_name("input")
                        .help("File to parse with the grammar")
                        .required(true),
                )
                .arg(section_arg())
                .arg(strength_arg())
                .arg(
                    Arg::with_name("trace")
                        .long("--trace")
                        .help("Trace every parser step on stderr"),
                )
                .about("Parses a file with a grammar and prints the parse tree"),
        )
        .setting(AppSettings::ArgRequiredElseHelp)
        .get_matches();

    match matches.subcommand() {
        ("extract", Some(opts)) => extract(opts),
        ("tokens", Some(opts)) => tokens(opts),
        ("report", Some(opts)) => report(opts),
        ("table", Some(opts)) => table(opts),
        ("graph", Some(opts)) => graph(opts),
        ("generate", Some(opts)) => generate(opts),
        ("parse", Some(opts)) => parse(opts),
        _ => Ok(()),
    }
}

fn document(opts: &ArgMatches) -> Result<Document, Box<dyn Error>> {
    let filename = opts.value_of("file").unwrap_or_default();
    Document::read(filename)
}

fn strength(opts: &ArgMatches) -> Result<Strength, Box<dyn Error>> {
    let strength = opts.value_of("strength").unwrap_or("LALR").parse()?;
    Ok(strength)
}

fn extract(opts: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let document = document(opts)?;
    let section = document.section(opts.value_of("section"))?;
    if opts.is_present("lines") {
        print!("{}", code_text_with_lines(&section.code, &document.path));
    } else {
        print!("{}", code_text(&section.code));
    }
    Ok(())
}

fn tokens(opts: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let document = document(opts)?;
    let section = document.section(opts.value_of("section"))?;
    let mut tokenizer = Tokenizer::new(section.code, TokenConfig::default());
    loop {
        let token = tokenizer.next_token();
        println!("{}", token);
        if token.kind == TokenKind::Eof {
            break;
        }
    }
    Ok(())
}

fn report(opts: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let document = document(opts)?;
    let grammar = document.grammar(opts.value_of("section"))?;
    let automaton = load::build(&grammar, strength(opts)?);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    grammar.write_symbols(&mut out)?;
    grammar.write_productions(&mut out)?;
    if automaton.strength >= Strength::Slr {
        let follow = if automaton.strength == Strength::Slr {
            Some(&automaton.follow[..])
        } else {
            None
        };
        grammar.write_first_follow(&mut out, &automaton.first, follow)?;
    }
    automaton.write_states(&mut out)?;
    automaton.write_conflicts(&mut out)?;
    Ok(())
}

fn table(opts: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let document = document(opts)?;
    let grammar = document.grammar(opts.value_of("section"))?;
    let automaton = load::build(&grammar, strength(opts)?);

    if let Some(csv_filename) = opts.value_of("csv") {
        table::write_table_csv(&automaton, csv_filename)?;
    } else {
        table::print_table(&automaton);
    }
    Ok(())
}

fn graph(opts: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let document = document(opts)?;
    let grammar = document.grammar(opts.value_of("section"))?;
    let automaton = load::build(&grammar, strength(opts)?);

    if let Some(output_filename) = opts.value_of("output") {
        graphviz::write_graphviz_graph(&automaton, output_filename)?;
    } else {
        graphviz::show_graphviz_graph(&automaton)?;
    }
    Ok(())
}

fn generate(opts: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let document = document(opts)?;
    let grammar = document.grammar(opts.value_of("section"))?;
    let automaton = load::build(&grammar, strength(opts)?);
    let header = match opts.value_of("header") {
        Some(name) => code_text(&document.section(Some(name))?.code),
        None => String::new(),
    };

    let source = lrtide_codegen::generate(&grammar, &automaton, &header)?;
    match opts.value_of("output") {
        Some(output_filename) => fs::write(output_filename, source)?,
        None => println!("{}", source),
    }
    Ok(())
}

fn parse(opts: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let document = document(opts)?;
    let grammar = document.grammar(opts.value_of("section"))?;
    let automaton = load::build(&grammar, strength(opts)?);
    let input_filename = opts.value_of("input").unwrap_or_default();
    run::parse_file(&grammar, &automaton, input_filename, opts.is_present("trace"))
}
