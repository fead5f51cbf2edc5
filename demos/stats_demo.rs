use clap::Parser;
use quad_probe::ProbingTable;
use quad_probe::TableConfig;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "keys", default_value_t = 40)]
    keys: usize,

    #[arg(short = 'd', long = "delete", default_value_t = 10)]
    delete: usize,

    #[arg(short = 'l', long = "max_load_factor", default_value_t = 0.7)]
    max_load_factor: f64,

    /// Print every slot after filling the table
    #[arg(long = "dump")]
    dump: bool,
}

fn main() {
    let args = Args::parse();

    let config = TableConfig::default().with_max_load_factor(args.max_load_factor);
    let mut table = match ProbingTable::with_config(config) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };

    println!(
        "Filling table (initial capacity {}) with {} keys...",
        table.capacity(),
        args.keys
    );

    for i in 0..args.keys {
        let key = format!("Pokemon-{i:04}");
        if let Err(err) = table.insert(&key, format!("entry #{i}")) {
            eprintln!("insert of {key} failed: {err}");
            std::process::exit(1);
        }
    }

    let mut deleted = 0;
    for i in (0..args.keys).step_by(2).take(args.delete) {
        if table.delete(&format!("pokemon-{i:04}")) {
            deleted += 1;
        }
    }

    println!("Inserted {} keys, deleted {}", args.keys, deleted);
    println!(
        "Final load factor: {:.2}% (max {:.2}%)",
        table.load_factor() * 100.0,
        table.max_load_factor() * 100.0
    );
    println!("Capacity: {} after {} resizes", table.capacity(), table.resizes());

    if args.dump {
        println!("Full Hash Table Contents:");
        print!("{}", table.dump());
    }

    println!("Probe histogram: {:?}", table.probe_histogram());
    table.debug_stats().print();
}
