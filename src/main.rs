use praxis::checker::report_diagnostic;
use praxis::pipeline::synthesize_source;
use praxis::{Attribute, Entity, Model, Type};
use std::{env, fs};

/// Configuration for the CLI application
struct Config {
    file_path: String,
    show_model: bool,
}

impl Config {
    /// Parse command line arguments and environment variables
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        let file_path = if args.len() > 1 {
            args[1].clone()
        } else {
            "demos/library.spec".to_string()
        };

        let show_model = env::var("MODEL").is_ok();

        Config {
            file_path,
            show_model,
        }
    }
}

/// Read the specification file from the given path
fn read_source_file(file_path: &str) -> Result<String, String> {
    fs::read_to_string(file_path).map_err(|e| {
        format!(
            "Error reading file '{}': {}\n\n\
            Usage: cargo run [specification_file.spec]\n\n\
            Available demos:\n\
            \x20 - demos/library.spec",
            file_path, e
        )
    })
}

/// The built-in data model the demo specifications are written against.
fn demo_model() -> Model {
    let mut model = Model::new();

    let mut person = Entity::new("Person");
    person
        .add_attribute(Attribute::new("age", Type::integer()))
        .expect("fresh entity");
    model.add_entity(person).expect("fresh model");

    let mut library = Entity::new("Library");
    library
        .add_attribute(Attribute::collection(
            "items",
            Type::set_of(Type::integer()),
        ))
        .expect("fresh entity");
    library
        .add_attribute(Attribute::collection(
            "log",
            Type::sequence_of(Type::integer()),
        ))
        .expect("fresh entity");
    library
        .add_attribute(Attribute::new("count", Type::integer()))
        .expect("fresh entity");
    library
        .add_attribute(Attribute::collection(
            "members",
            Type::set_of(Type::entity("Person")),
        ))
        .expect("fresh entity");
    model.add_entity(library).expect("fresh model");

    model
}

fn main() {
    // Parse configuration
    let config = Config::from_args();

    println!("\n{}", config.file_path);
    println!("{}", "=".repeat(60));

    // Read the specification file
    let src = match read_source_file(&config.file_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    // Print the specification text
    println!("\nSpecification:");
    println!("{}", "-".repeat(60));
    println!("{}", src);
    println!("{}", "-".repeat(60));

    let model = demo_model();

    if config.show_model {
        println!("\nData model:");
        for entity in &model.entities {
            println!("  {}", entity.name);
            for attr in &entity.attributes {
                println!("    {} : {}", attr.name, attr.ty);
            }
        }
    }

    // Parse and synthesize every operation specification
    let outcomes = match synthesize_source(&src, &model) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            println!();
            eprintln!("{}", e);
            return;
        }
    };

    println!("\nSynthesized operations:");
    println!("{}", "=".repeat(60));

    let mut failures = 0;
    for (i, outcome) in outcomes.iter().enumerate() {
        let name = match &outcome.entity {
            Some(entity) => format!("{}::{}", entity, outcome.operation),
            None => outcome.operation.clone(),
        };
        println!("\n[{}] {}", i + 1, name);
        println!("{}", "-".repeat(60));
        println!("{}", outcome.statement);

        for diag in outcome.diagnostics.iter() {
            report_diagnostic(&name, &src, diag);
        }
        if !outcome.succeeded() {
            failures += 1;
        }
    }

    println!("\n{}", "=".repeat(60));
    if failures == 0 {
        println!("Successfully synthesized {} operation(s)", outcomes.len());
    } else {
        println!(
            "Synthesized {} operation(s), {} with errors",
            outcomes.len(),
            failures
        );
    }
}
