use extract::Category;
use report::{ActiveFilter, AdvancedQuery};
use std::path::PathBuf;

pub const HELP: &str = "\
Type a target (username, email, domain, phone) to investigate it. Once a
report is shown, typing another value pivots the investigation to it.

  :new <target>            start a fresh investigation
  :dig <category> <n>      deep search on item n of a category
  :filter [category|all]   list filters, or show one category
  :show                    print the current report
  :graph [file.svg]        list graph nodes, or write the graph as SVG
  :select <node-id>        highlight a graph leaf in the report
  :path                    show the investigation path
  :messages                list the conversation
  :view <n>                show the report carried by message n
  :history                 list saved investigations
  :load <target>           open a saved investigation
  :clear-history           delete all saved investigations
  :export [dir]            save the report as JSON
  :share                   print a Telegram share link
  :adv all | any | none    build a query from word groups and run it
  :reset                   drop the current investigation
  :help                    show this help
  :quit                    exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Query(String),
    New(String),
    Dig { category: Category, index: usize },
    Filter(Option<ActiveFilter>),
    Show,
    Graph(Option<PathBuf>),
    Select(String),
    Path,
    Messages,
    View(usize),
    History,
    Load(String),
    ClearHistory,
    Export(Option<PathBuf>),
    Share,
    Advanced(AdvancedQuery),
    Reset,
    Help,
    Quit,
}

fn required(arg: &str, usage: &str) -> Result<String, String> {
    let arg = arg.trim();
    if arg.is_empty() { Err(format!("usage: {}", usage)) } else { Ok(arg.to_string()) }
}

fn optional_path(arg: &str) -> Option<PathBuf> {
    let arg = arg.trim();
    (!arg.is_empty()).then(|| PathBuf::from(arg))
}

fn position(arg: &str, usage: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("usage: {}", usage)),
    }
}

/// `all words | any words | none words`; missing groups are empty.
fn parse_advanced(arg: &str) -> AdvancedQuery {
    let mut groups = arg.splitn(3, '|').map(|g| g.trim().to_string());
    AdvancedQuery {
        all_words: groups.next().unwrap_or_default(),
        any_words: groups.next().unwrap_or_default(),
        none_words: groups.next().unwrap_or_default(),
    }
}

/// Parse one REPL line. `Ok(None)` for a blank line.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Some(Command::Query(line.to_string())));
    };

    let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let command = match name {
        "new" => Command::New(required(arg, ":new <target>")?),
        "dig" => {
            let usage = ":dig <category> <n>";
            let (category, n) = arg
                .trim()
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("usage: {}", usage))?;
            Command::Dig {
                category: category.parse()?,
                index: position(n, usage)? - 1,
            }
        }
        "filter" => match arg.trim() {
            "" => Command::Filter(None),
            f => Command::Filter(Some(f.parse()?)),
        },
        "show" => Command::Show,
        "graph" => Command::Graph(optional_path(arg)),
        "select" => Command::Select(required(arg, ":select <node-id>")?),
        "path" => Command::Path,
        "messages" => Command::Messages,
        "view" => Command::View(position(arg, ":view <n>")?),
        "history" => Command::History,
        "load" => Command::Load(required(arg, ":load <target>")?),
        "clear-history" => Command::ClearHistory,
        "export" => Command::Export(optional_path(arg)),
        "share" => Command::Share,
        "adv" => Command::Advanced(parse_advanced(arg)),
        "reset" => Command::Reset,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command :{} (try :help)", other)),
    };
    Ok(Some(command))
}
