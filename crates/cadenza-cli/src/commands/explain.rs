//! Explain command - show how a query is parsed.

use cadenza_core::expr::{lookup, parse_expression, Expr};
use cadenza_core::matcher::resolve_property;
use cadenza_core::{parse_terms, tokenize, Config, Dialect, NormalizeCache};

/// Run the explain command. Needs no catalog.
pub fn run(config: Config, query: &str, dialect: Option<Dialect>) -> anyhow::Result<()> {
    let dialect = dialect.unwrap_or(config.search.dialect).resolve(query);
    println!("Dialect: {}", dialect);

    match dialect {
        Dialect::Expression => {
            let expr = parse_expression(query);
            println!("Expression: {}", expr);
            println!();
            print_tree(&expr, 0);
        }
        _ => {
            let tokens = tokenize(query);
            println!("Tokens: {:?}", tokens);

            let terms = parse_terms(query, &NormalizeCache::new());
            if terms.is_empty() {
                println!("Terms: none (matches every item)");
            } else {
                println!("Terms (all must hold):");
            }
            for term in &terms {
                let note = match term.property.as_deref() {
                    Some(name) if resolve_property(name).is_none() => "  [unknown property]",
                    _ => "",
                };
                println!("  {}{}", term, note);
            }
        }
    }

    Ok(())
}

fn print_tree(expr: &Expr, depth: usize) {
    let indent = "  ".repeat(depth);
    match expr {
        Expr::Atom(text) => println!("{}{:?}", indent, text),
        Expr::List(items) => match items.split_first() {
            None => println!("{}(all)", indent),
            Some((Expr::Atom(head), args)) => {
                let note = if lookup(head).is_some() {
                    ""
                } else {
                    "  [unknown, matched as text]"
                };
                println!("{}{}{}", indent, head, note);
                for arg in args {
                    print_tree(arg, depth + 1);
                }
            }
            Some(_) => {
                println!("{}and", indent);
                for item in items {
                    print_tree(item, depth + 1);
                }
            }
        },
    }
}
