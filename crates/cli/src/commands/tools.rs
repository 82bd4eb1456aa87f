//! `reagent tools` — list the built-in tools.

use reagent_core::ToolDefinition;

pub fn run() -> anyhow::Result<()> {
    let registry = reagent_tools::default_registry();

    println!();
    println!("  Built-in tools ({}):", registry.len());
    println!();
    for definition in registry.definitions() {
        print_definition(&definition);
    }
    print_definition(&ToolDefinition::final_answer());
    Ok(())
}

fn print_definition(definition: &ToolDefinition) {
    println!("  {}", definition.name);
    println!("      {}", definition.description);
    if let Some(properties) = definition
        .parameters
        .as_ref()
        .and_then(|schema| schema.get("properties"))
        .and_then(|p| p.as_object())
    {
        let names: Vec<&str> = properties.keys().map(String::as_str).collect();
        println!("      parameters: {}", names.join(", "));
    }
    println!();
}
