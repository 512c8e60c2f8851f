//! fgui CLI - Tool for inspecting UI packages and their component trees.

use std::env;
use std::process;
use std::sync::Arc;

use fgui::engine::ObjectId;
use fgui::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `fgui=debug`.
const LOG_ENV: &str = "FGUI_LOG";

fn init_logging(default: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut config = Config::default();
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "-b" | "--branch" => match iter.next() {
                Some(b) => config = config.with_branch(b.as_str()),
                None => fail("--branch needs a value"),
            },
            "--var" => match iter.next().and_then(|kv| kv.split_once('=')) {
                Some((k, v)) => config = config.with_var(k, v),
                None => fail("--var needs key=value"),
            },
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    match filtered_args[0] {
        // Info command - show package summary
        "info" | "i" => {
            let Some(path) = filtered_args.get(1) else {
                fail("missing file argument\nUsage: fgui-cli info <file>");
            };
            cmd_info(path, &config);
        }

        // Items command - list the item directory
        "items" | "l" => {
            let Some(path) = filtered_args.get(1) else {
                fail("missing file argument\nUsage: fgui-cli items <file>");
            };
            cmd_items(path, &config);
        }

        // Tree command - build a component and print its objects
        "tree" | "t" => {
            let (Some(path), Some(name)) = (filtered_args.get(1), filtered_args.get(2)) else {
                fail("missing argument\nUsage: fgui-cli tree <file> <component> [deps...]");
            };
            cmd_tree(path, name, &filtered_args[3..], config);
        }

        "help" | "h" | "-h" | "--help" => print_help(),

        "version" | "-V" | "--version" => {
            println!("fgui {} (built {})", env!("CARGO_PKG_VERSION"), env!("FGUI_BUILD_DATE"));
        }

        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
            process::exit(1);
        }
    }
}

fn print_help() {
    println!("fgui {} - UI package toolkit (built {})", env!("CARGO_PKG_VERSION"), env!("FGUI_BUILD_DATE"));
    println!();
    println!("USAGE:");
    println!("    fgui-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>                      Show package header and item counts");
    println!("    l, items  <file>                      List items with their types and sizes");
    println!("    t, tree   <file> <component> [deps]   Build a component and print its objects");
    println!("    h, help                               Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose        Debug logging");
    println!("    -vv, --trace         Trace logging");
    println!("    -q, --quiet          Errors only");
    println!("    -b, --branch <name>  Active branch");
    println!("    --var <key=value>    Controller home-page variable");
    println!();
    println!("The {} environment variable overrides the log filter.", LOG_ENV);
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {}", msg);
    process::exit(1);
}

fn open(path: &str, config: &Config) -> Arc<Package> {
    info!("Opening package: {}", path);
    match Package::open(path, config) {
        Ok(p) => p,
        Err(e) => fail(&format!("failed to open {}: {}", path, e)),
    }
}

fn cmd_info(path: &str, config: &Config) {
    let package = open(path, config);

    println!("Package: {} ({})", package.name(), package.id());
    println!("Version: {}", package.version());
    println!("Strings: {}", package.strings().len());
    if !package.branches().is_empty() {
        println!("Branches: {}", package.branches().join(", "));
    }
    for dep in package.dependencies() {
        println!("Depends: {} ({})", dep.name, dep.id);
    }
    println!();

    let mut counts = [0usize; 11];
    for item in package.items() {
        counts[item.item_type as usize] += 1;
    }
    println!("Items:");
    for (i, n) in counts.iter().enumerate().filter(|(_, n)| **n > 0) {
        println!("  {:<12} {}", format!("{:?}:", PackageItemType::from_u8(i as u8)), n);
    }
    println!("Sprites: {}", package.sprites().count());

    match package.preload_all() {
        Ok(()) => println!("All payloads decode cleanly"),
        Err(e) => println!("Decode error: {}", e),
    }
}

fn cmd_items(path: &str, config: &Config) {
    let package = open(path, config);
    for item in package.items() {
        let asset = match item.asset() {
            Ok(a) => a.kind().to_string(),
            Err(e) => format!("error: {}", e),
        };
        println!(
            "{:<10} {:<24} {:<12} {:>5}x{:<5} {}",
            item.id,
            item.name,
            format!("{:?}", item.item_type),
            item.width,
            item.height,
            asset
        );
    }
}

fn cmd_tree(path: &str, name: &str, deps: &[&str], config: Config) {
    let package = open(path, &config);
    let mut registry = Registry::new();
    registry.add(package.clone());
    for dep in deps {
        registry.add(open(dep, &config));
    }
    debug!("registry holds {} packages", registry.len());

    let Some(item) = package.item_by_name(name).or_else(|| package.item_by_id(name)) else {
        fail(&format!("no item {} in {}", name, package.name()));
    };
    let tree = match Tree::build(&registry, item, config) {
        Ok(t) => t,
        Err(e) => fail(&format!("failed to build {}: {}", name, e)),
    };

    println!("Component: {} ({} objects)", item.name, tree.len());
    println!();
    print_tree(&tree, tree.root(), 0);
}

fn print_tree(tree: &Tree, id: ObjectId, depth: usize) {
    let Some(node) = tree.node(id) else {
        return;
    };
    let indent = "  ".repeat(depth);
    let r = node.rect();
    let hidden = if tree.is_visible(id) { "" } else { " hidden" };
    println!(
        "{}{} [{:?}] {},{} {}x{}{}",
        indent, node.name(), node.object_type(), r.x, r.y, r.width, r.height, hidden
    );
    for c in node.controllers() {
        println!("{}  @{} = {:?}", indent, c.name(), c.selected_page());
    }
    for &child in node.children() {
        print_tree(tree, child, depth + 1);
    }
}
