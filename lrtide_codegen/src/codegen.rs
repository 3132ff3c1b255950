use std::str::FromStr;

use proc_macro2::{Ident, Literal, TokenStream};
use quote::{format_ident, quote};
use regex::Regex;

use lrtide_core::{Automaton, Grammar, Production, Symbol, Table, ValueType};

use crate::CodegenError;

/// Emit Rust source for the tables and actions of a grammar
///
/// The generated module contains `KNOWN`, `NAMES`, one `GOTO_n` table per state, `STATES`,
/// `token_config()`, a `Value` enum with a variant per typed nonterminal and `Reducer`, which
/// implements `lrtide::Actions`. Values of typed nonterminals start out as `Default::default()`
/// before the action code runs.
pub fn generate(
    grammar: &Grammar,
    automaton: &Automaton,
    header: &str,
) -> Result<String, CodegenError> {
    let header = TokenStream::from_str(header).map_err(|err| CodegenError::Header {
        message: format!("{:?}", err),
    })?;
    let table = automaton.table();
    let placeholder = Regex::new(r"\$(\d+)")?;

    let tables = generate_tables(&table);
    let token_config = generate_token_config(&table);
    let value_enum = generate_value_enum(grammar)?;
    let reducer = generate_reducer(grammar, &placeholder)?;

    let token_stream = quote! {
        #header

        #tables
        #token_config
        #value_enum
        #reducer
    };

    log::debug!(
        "generated {} states and {} productions",
        table.states.len(),
        grammar.productions.len()
    );
    Ok(token_stream.to_string())
}

fn lit(value: usize) -> Literal {
    Literal::usize_unsuffixed(value)
}

fn generate_tables(table: &Table) -> TokenStream {
    let mut gotos = TokenStream::new();
    let mut rows = Vec::new();

    for (idx, state) in table.states.iter().enumerate() {
        let goto_ident = format_ident!("GOTO_{}", idx);
        let len = lit(state.go_to.len());
        let entries = state.go_to.iter().map(|(sym, target)| {
            let (sym, target) = (lit(*sym), lit(*target));
            quote! { lrtide::Goto { sym: #sym, state: #target } }
        });
        gotos.extend(quote! {
            static #goto_ident: [lrtide::Goto; #len] = [#(#entries),*];
        });

        let reduce_prod = match state.reduce_prod {
            Some(prod) => {
                let prod = lit(prod);
                quote! { Some(#prod) }
            }
            None => quote! { None },
        };
        let reduce_size = lit(state.reduce_size);
        let reduce_sym = lit(state.reduce_sym);
        let starts_line = state.starts_line;
        let newline_only = state.newline_only;
        let min_prefix = lit(state.min_prefix);
        rows.push(quote! {
            lrtide::State {
                go_to: &#goto_ident,
                reduce_prod: #reduce_prod,
                reduce_size: #reduce_size,
                reduce_sym: #reduce_sym,
                starts_line: #starts_line,
                newline_only: #newline_only,
                min_prefix: #min_prefix,
            }
        });
    }

    let state_count = lit(table.states.len());
    let known = &table.known;
    let known_count = lit(known.len());
    let names = &table.names;
    let name_count = lit(names.len());

    quote! {
        pub static KNOWN: [&str; #known_count] = [#(#known),*];
        pub static NAMES: [&str; #name_count] = [#(#names),*];

        #gotos

        pub static STATES: [lrtide::State<'static>; #state_count] = [#(#rows),*];
    }
}

fn generate_token_config(table: &Table) -> TokenStream {
    let ignored = table.ignored.bits();
    quote! {
        pub fn token_config() -> lrtide::TokenConfig<'static> {
            lrtide::TokenConfig {
                ignored: lrtide::scan::Ignored::from_bits_truncate(#ignored),
                known: &KNOWN,
                ..lrtide::TokenConfig::default()
            }
        }
    }
}

fn variant_ident(symbol: &Symbol) -> Ident {
    match symbol.name.as_str() {
        "Token" | "Error" | "None" => format_ident!("{}_", symbol.name),
        name => format_ident!("{}", name),
    }
}

fn value_type_tokens(value_type: &ValueType) -> Result<TokenStream, CodegenError> {
    let inner = TokenStream::from_str(value_type.name()).map_err(|err| CodegenError::ValueType {
        name: value_type.name().to_owned(),
        message: format!("{:?}", err),
    })?;
    Ok(match value_type {
        ValueType::Boxed(_) => quote! { Box<#inner> },
        ValueType::Plain(_) => inner,
    })
}

fn generate_value_enum(grammar: &Grammar) -> Result<TokenStream, CodegenError> {
    let mut variants = TokenStream::new();
    for symbol in grammar.nonterminals() {
        if let Some(value_type) = &symbol.value_type {
            let variant = variant_ident(symbol);
            let ty = value_type_tokens(value_type)?;
            variants.extend(quote! { #variant(#ty), });
        }
    }

    Ok(quote! {
        #[derive(Debug)]
        pub enum Value<'a> {
            Token(lrtide::Token<'a>),
            Error(lrtide::Token<'a>),
            None,
            #variants
        }
    })
}

fn generate_reducer(grammar: &Grammar, placeholder: &Regex) -> Result<TokenStream, CodegenError> {
    let mut arms = TokenStream::new();
    for (prod, production) in grammar.productions.iter().enumerate().skip(1) {
        let arm = generate_reduce_arm(grammar, prod, production, placeholder)?;
        let prod = lit(prod);
        arms.extend(quote! {
            #prod => { #arm }
        });
    }

    Ok(quote! {
        #[derive(Debug, Default)]
        pub struct Reducer;

        impl<'a> lrtide::Actions<'a> for Reducer {
            type Value = Value<'a>;

            fn token(&mut self, token: &lrtide::Token<'a>) -> Value<'a> {
                Value::Token(*token)
            }

            fn error(&mut self, token: &lrtide::Token<'a>) -> Value<'a> {
                Value::Error(*token)
            }

            #[allow(unused_mut, unused_variables)]
            fn reduce(&mut self, prod: usize, body: Vec<Value<'a>>) -> Value<'a> {
                let mut __body = body.into_iter();
                match prod {
                    #arms
                    _ => Value::None,
                }
            }
        }
    })
}

fn generate_reduce_arm(
    grammar: &Grammar,
    prod: usize,
    production: &Production,
    placeholder: &Regex,
) -> Result<TokenStream, CodegenError> {
    let head = &grammar.symbols[production.head];

    let action = match &production.action {
        Some(code) => code,
        None => return Ok(generate_passthrough(grammar, production)),
    };
    let rewritten = placeholder.replace_all(action, "__lr_${1}");
    let action = TokenStream::from_str(&rewritten).map_err(|err| CodegenError::Action {
        prod,
        line: production.action_line,
        message: format!("{:?}", err),
    })?;

    let mut bindings = TokenStream::new();
    for (pos, sym) in production.body.iter().enumerate() {
        let binding = format_ident!("__lr_{}", pos + 1);
        let symbol = &grammar.symbols[*sym];
        bindings.extend(match &symbol.value_type {
            Some(_) if symbol.is_nonterminal() => {
                let variant = variant_ident(symbol);
                quote! {
                    let mut #binding = match __body.next() {
                        Some(Value::#variant(value)) => value,
                        _ => Default::default(),
                    };
                }
            }
            _ if symbol.is_terminal() => quote! {
                let mut #binding = match __body.next() {
                    Some(Value::Token(token)) | Some(Value::Error(token)) => token,
                    _ => lrtide::Token::synthetic(lrtide::TokenKind::Error, 0, 0),
                };
            },
            _ => quote! {
                let mut #binding = __body.next();
            },
        });
    }

    Ok(match &head.value_type {
        Some(value_type) => {
            let variant = variant_ident(head);
            let ty = value_type_tokens(value_type)?;
            quote! {
                #bindings
                let mut __lr_0: #ty = Default::default();
                { #action }
                Value::#variant(__lr_0)
            }
        }
        None => quote! {
            #bindings
            { #action }
            Value::None
        },
    })
}

/// Value of a production without action code
///
/// A single body value of the head's own type is passed through, anything else gives the
/// head's default value.
fn generate_passthrough(grammar: &Grammar, production: &Production) -> TokenStream {
    let head = &grammar.symbols[production.head];
    let value_type = match &head.value_type {
        Some(value_type) => value_type,
        None => return quote! { Value::None },
    };
    let variant = variant_ident(head);
    let first_matches = production
        .body
        .first()
        .map(|sym| grammar.symbols[*sym].value_type.as_ref() == Some(value_type))
        .unwrap_or(false);
    if production.body.len() == 1 && first_matches {
        let first = variant_ident(&grammar.symbols[production.body[0]]);
        quote! {
            match __body.next() {
                Some(Value::#first(value)) => Value::#variant(value),
                _ => Value::#variant(Default::default()),
            }
        }
    } else {
        quote! { Value::#variant(Default::default()) }
    }
}
