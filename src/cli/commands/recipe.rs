//! `larder recipe` command - Recipe management

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::utils::{print_legacy_banner, Workspace};
use crate::cli::helpers::{confirm, format_short_id};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::quantity::Servings;
use crate::core::store::{RecipeFilter, WriteOutcome};
use crate::core::Config;
use crate::entities::{Ingredient, Recipe, RecipeFields};

#[derive(Subcommand, Debug)]
pub enum RecipeCommands {
    /// List recipes, newest first
    List(ListArgs),

    /// Create a new recipe
    New(NewArgs),

    /// Show a recipe, optionally rescaled to another number of servings
    Show(ShowArgs),

    /// Change fields of an existing recipe
    Edit(EditArgs),

    /// Delete a recipe
    Delete(DeleteArgs),

    /// List the categories in use
    Categories,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by category (exact match)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Search in titles (case-insensitive substring)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Limit output to N items
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only, not the items
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Dish name
    #[arg(long, short = 't', required_unless_present = "interactive")]
    pub title: Option<String>,

    /// Number of servings the quantities are written for
    #[arg(long)]
    pub servings: Option<Servings>,

    /// Display emoji
    #[arg(long)]
    pub emoji: Option<String>,

    /// Category label
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Ingredient as "QTY UNIT NAME", e.g. "500 g farine" (repeatable)
    #[arg(long = "ingredient", short = 'g', value_name = "SPEC")]
    pub ingredients: Vec<String>,

    /// Preparation step (repeatable, in order)
    #[arg(long = "step", value_name = "TEXT")]
    pub steps: Vec<String>,

    /// Color tag
    #[arg(long)]
    pub color: Option<String>,

    /// Prompt for every field
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Recipe ID, ID prefix, or title
    pub id: String,

    /// Rescale quantities to this many servings (values below 1 count as 1)
    #[arg(long, allow_negative_numbers = true)]
    pub servings: Option<i64>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Recipe ID, ID prefix, or title
    pub id: String,

    /// New dish name
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// New base serving count
    #[arg(long)]
    pub servings: Option<Servings>,

    /// New display emoji
    #[arg(long)]
    pub emoji: Option<String>,

    /// New category (empty string clears it)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Replace all ingredients (repeatable)
    #[arg(long = "ingredient", short = 'g', value_name = "SPEC")]
    pub ingredients: Vec<String>,

    /// Replace all steps (repeatable)
    #[arg(long = "step", value_name = "TEXT")]
    pub steps: Vec<String>,

    /// New color tag
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Recipe ID, ID prefix, or title
    pub id: String,

    /// Skip confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

const LIST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 18),
    ColumnDef::new("title", "TITLE", 40),
    ColumnDef::new("category", "CATEGORY", 18),
    ColumnDef::new("servings", "SERVES", 8),
    ColumnDef::new("created", "CREATED", 12),
];

const INGREDIENT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("quantity", "QTY", 14),
    ColumnDef::new("unit", "UNIT", 6),
    ColumnDef::new("name", "INGREDIENT", 40),
];

pub async fn run(cmd: RecipeCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        RecipeCommands::List(args) => run_list(args, global).await,
        RecipeCommands::New(args) => run_new(args, global).await,
        RecipeCommands::Show(args) => run_show(args, global).await,
        RecipeCommands::Edit(args) => run_edit(args, global).await,
        RecipeCommands::Delete(args) => run_delete(args, global).await,
        RecipeCommands::Categories => run_categories(global).await,
    }
}

async fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global).await?;
    let format = ws.format(global);

    let filter = RecipeFilter {
        category: args.category,
        search: args.search,
    };
    let mut recipes = ws.store.filter(&filter);
    if let Some(limit) = args.limit {
        recipes.truncate(limit);
    }

    if args.count {
        println!("{}", recipes.len());
        return Ok(());
    }

    let interactive = matches!(format, OutputFormat::Auto | OutputFormat::Tsv);
    if interactive && !global.quiet {
        print_legacy_banner(&ws.legacy());
    }

    if recipes.is_empty() {
        match format {
            OutputFormat::Json | OutputFormat::Yaml => println!("[]"),
            OutputFormat::Auto | OutputFormat::Tsv => {
                println!("No recipes found.");
                println!();
                println!(
                    "Create one with: {}",
                    style("larder recipe new --title \"...\"").yellow()
                );
            }
            _ => {}
        }
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&recipes).into_diagnostic()?;
            println!("{}", json);
            Ok(())
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&recipes).into_diagnostic()?;
            print!("{}", yaml);
            Ok(())
        }
        f => {
            let rows: Vec<TableRow> = recipes.iter().map(list_row).collect();
            let config = if global.quiet {
                TableConfig::for_pipe()
            } else {
                TableConfig::default()
            };
            TableFormatter::new(LIST_COLUMNS, "recipe")
                .with_config(config)
                .output(&rows, f)
        }
    }
}

fn list_row(recipe: &Recipe) -> TableRow {
    TableRow::new(recipe.id.to_string())
        .cell("id", CellValue::Id(recipe.id.to_string()))
        .cell(
            "title",
            CellValue::Text(format!("{} {}", recipe.emoji, recipe.title)),
        )
        .cell("category", CellValue::Category(recipe.category.clone()))
        .cell(
            "servings",
            CellValue::Number(i64::from(recipe.base_servings.get())),
        )
        .cell("created", CellValue::Date(recipe.created_at))
}

async fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global).await?;

    let fields = if args.interactive {
        prompt_fields(&ws.config, &args)?
    } else {
        fields_from_args(&ws.config, &args)?
    };

    let (recipe, pending) = ws.store.add(fields.sorted_for_save());
    persist(pending.wait().await, "saved")?;

    match ws.format(global) {
        OutputFormat::Id => println!("{}", recipe.id),
        _ if global.quiet => {}
        _ => println!(
            "{} Created recipe {} {} {}",
            style("✓").green(),
            style(format_short_id(&recipe.id)).cyan(),
            recipe.emoji,
            style(&recipe.title).bold()
        ),
    }
    Ok(())
}

fn fields_from_args(config: &Config, args: &NewArgs) -> Result<RecipeFields> {
    let title = args
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| miette::miette!("A recipe needs a title"))?;

    Ok(RecipeFields::new(title)
        .with_servings(args.servings.unwrap_or_else(|| config.servings()))
        .with_emoji(args.emoji.clone().unwrap_or_else(|| config.emoji()))
        .with_color(args.color.clone().unwrap_or_else(|| config.color()))
        .with_category(args.category.clone())
        .with_ingredients(parse_ingredients(&args.ingredients)?)
        .with_steps(clean_steps(&args.steps)))
}

fn prompt_fields(config: &Config, args: &NewArgs) -> Result<RecipeFields> {
    let theme = ColorfulTheme::default();

    let title: String = Input::with_theme(&theme)
        .with_prompt("Title")
        .with_initial_text(args.title.clone().unwrap_or_default())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("A recipe needs a title")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .into_diagnostic()?;

    let servings: Servings = Input::with_theme(&theme)
        .with_prompt("Servings")
        .default(args.servings.unwrap_or_else(|| config.servings()))
        .interact_text()
        .into_diagnostic()?;

    let emoji: String = Input::with_theme(&theme)
        .with_prompt("Emoji")
        .default(args.emoji.clone().unwrap_or_else(|| config.emoji()))
        .interact_text()
        .into_diagnostic()?;

    let category: String = Input::with_theme(&theme)
        .with_prompt("Category (optional)")
        .with_initial_text(args.category.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()
        .into_diagnostic()?;

    let mut ingredients = parse_ingredients(&args.ingredients)?;
    loop {
        let line: String = Input::with_theme(&theme)
            .with_prompt("Ingredient, e.g. \"200 g sucre\" (empty to finish)")
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?;
        if line.trim().is_empty() {
            break;
        }
        match Ingredient::from_spec(&line) {
            Ok(ing) => ingredients.push(ing),
            Err(e) => eprintln!("{} {}", style("!").yellow(), e),
        }
    }

    let mut steps = clean_steps(&args.steps);
    loop {
        let step: String = Input::with_theme(&theme)
            .with_prompt(format!("Step {} (empty to finish)", steps.len() + 1))
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?;
        if step.trim().is_empty() {
            break;
        }
        steps.push(step.trim().to_string());
    }

    Ok(RecipeFields::new(title.trim())
        .with_servings(servings)
        .with_emoji(emoji)
        .with_color(args.color.clone().unwrap_or_else(|| config.color()))
        .with_category(Some(category))
        .with_ingredients(ingredients)
        .with_steps(steps))
}

fn parse_ingredients(specs: &[String]) -> Result<Vec<Ingredient>> {
    specs
        .iter()
        .map(|spec| Ingredient::from_spec(spec).map_err(|e| miette::miette!("{}", e)))
        .collect()
}

fn clean_steps(steps: &[String]) -> Vec<String> {
    steps
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Turn a failed remote write into a command error
///
/// The store has already notified the user.
fn persist(outcome: WriteOutcome, verb: &str) -> Result<()> {
    match outcome {
        WriteOutcome::Persisted => Ok(()),
        WriteOutcome::Failed(reason) => Err(miette::miette!(
            "Recipe was not {} to the recipe book: {}",
            verb,
            reason
        )),
    }
}

async fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global).await?;
    let recipe = ws.resolve(&args.id)?;

    let target = args
        .servings
        .map(Servings::clamped)
        .unwrap_or(recipe.base_servings);

    match ws.format(global) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&scaled_copy(&recipe, target, args.servings.is_some()))
                .into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&scaled_copy(&recipe, target, args.servings.is_some()))
                .into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => println!("{}", recipe.id),
        OutputFormat::Csv => {
            TableFormatter::new(INGREDIENT_COLUMNS, "ingredient")
                .output(&ingredient_rows(&recipe, target), OutputFormat::Csv)?;
        }
        OutputFormat::Md => print!("{}", render_md(&recipe, target)),
        OutputFormat::Auto | OutputFormat::Tsv => print_recipe(&recipe, target),
    }
    Ok(())
}

/// The recipe as it reads at `target` servings
fn scaled_copy(recipe: &Recipe, target: Servings, rescale: bool) -> Recipe {
    if !rescale {
        return recipe.clone();
    }
    let mut out = recipe.clone();
    out.ingredients = recipe
        .scaled_ingredients(target)
        .into_iter()
        .map(|(qty, ing)| Ingredient::new(qty.to_string(), ing.unit.clone(), ing.name.clone()))
        .collect();
    out.base_servings = target;
    out
}

fn ingredient_rows(recipe: &Recipe, target: Servings) -> Vec<TableRow> {
    recipe
        .scaled_ingredients(target)
        .into_iter()
        .map(|(qty, ing)| {
            TableRow::new(ing.name.clone())
                .cell("quantity", CellValue::Text(qty.to_string()))
                .cell("unit", CellValue::Text(ing.unit.to_string()))
                .cell("name", CellValue::Text(ing.name.clone()))
        })
        .collect()
}

fn print_recipe(recipe: &Recipe, target: Servings) {
    println!("{} {}", recipe.emoji, style(&recipe.title).bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&recipe.id).cyan());
    if let Some(category) = recipe.category() {
        println!("{}: {}", style("Category").bold(), style(category).yellow());
    }
    if target == recipe.base_servings {
        println!("{}: {}", style("Servings").bold(), target);
    } else {
        println!(
            "{}: {} {}",
            style("Servings").bold(),
            style(target).cyan(),
            style(format!("(written for {})", recipe.base_servings)).dim()
        );
    }
    println!(
        "{}: {}",
        style("Created").bold(),
        recipe.created_at.format("%Y-%m-%d %H:%M")
    );

    if !recipe.ingredients.is_empty() {
        println!();
        println!("{}", style("Ingredients").bold());
        for (qty, ing) in recipe.scaled_ingredients(target) {
            let scaled = Ingredient::new(qty.to_string(), ing.unit.clone(), ing.name.clone());
            println!("  • {}", scaled);
        }
    }

    if !recipe.steps.is_empty() {
        println!();
        println!("{}", style("Steps").bold());
        for (i, step) in recipe.steps.iter().enumerate() {
            println!("  {}. {}", style(i + 1).cyan(), step);
        }
    }
}

fn render_md(recipe: &Recipe, target: Servings) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {} {}\n\n", recipe.emoji, recipe.title));
    if let Some(category) = recipe.category() {
        out.push_str(&format!("**Category:** {}\n\n", category));
    }
    out.push_str(&format!("**Servings:** {}\n\n", target));

    if !recipe.ingredients.is_empty() {
        out.push_str("## Ingredients\n\n");
        out.push_str(
            &TableFormatter::new(INGREDIENT_COLUMNS, "ingredient")
                .render_md(&ingredient_rows(recipe, target)),
        );
        out.push('\n');
    }

    if !recipe.steps.is_empty() {
        out.push_str("## Steps\n\n");
        for (i, step) in recipe.steps.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, step));
        }
    }
    out
}

async fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global).await?;
    let recipe = ws.resolve(&args.id)?;

    let mut fields = recipe.fields();
    if let Some(title) = args.title.as_deref().map(str::trim) {
        if title.is_empty() {
            return Err(miette::miette!("A recipe needs a title"));
        }
        fields.title = title.to_string();
    }
    if let Some(servings) = args.servings {
        fields.base_servings = servings;
    }
    if let Some(emoji) = args.emoji {
        fields.emoji = emoji;
    }
    if let Some(color) = args.color {
        fields.color = color;
    }
    if args.category.is_some() {
        fields = fields.with_category(args.category);
    }
    if !args.ingredients.is_empty() {
        fields.ingredients = parse_ingredients(&args.ingredients)?;
    }
    if !args.steps.is_empty() {
        fields.steps = clean_steps(&args.steps);
    }

    let fields = fields.sorted_for_save();
    if fields == recipe.fields() {
        if !global.quiet {
            println!("{} No changes to {}", style("!").yellow(), recipe.title);
        }
        return Ok(());
    }

    let pending = ws.store.update(&recipe.id, fields);
    persist(pending.wait().await, "updated")?;

    if !global.quiet {
        let updated = ws.store.get(&recipe.id).unwrap_or(recipe);
        println!(
            "{} Updated recipe {} {}",
            style("✓").green(),
            style(format_short_id(&updated.id)).cyan(),
            style(&updated.title).bold()
        );
    }
    Ok(())
}

async fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global).await?;
    let recipe = ws.resolve(&args.id)?;

    if !args.yes {
        let question = format!(
            "Delete recipe {} {}?",
            style(format_short_id(&recipe.id)).cyan(),
            style(&recipe.title).bold()
        );
        if !confirm(&question)? {
            return Ok(());
        }
    }

    let pending = ws.store.delete(&recipe.id);
    persist(pending.wait().await, "deleted")?;

    if !global.quiet {
        println!(
            "{} Deleted recipe {} {}",
            style("✓").green(),
            style(format_short_id(&recipe.id)).cyan(),
            recipe.title
        );
    }
    Ok(())
}

async fn run_categories(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global).await?;
    let categories = ws.store.categories();

    match ws.format(global) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&categories).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&categories).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for category in &categories {
                println!("{}", category);
            }
        }
        _ => {
            if categories.is_empty() {
                println!("No categories yet.");
                return Ok(());
            }
            for category in &categories {
                let filter = RecipeFilter {
                    category: Some(category.clone()),
                    search: None,
                };
                let n = ws.store.filter(&filter).len();
                println!("{:<24} {}", style(category).yellow(), style(n).dim());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::RecipeId;
    use crate::core::quantity::Unit;
    use chrono::Utc;

    fn recipe() -> Recipe {
        let fields = RecipeFields::new("Pâte à crêpes")
            .with_servings(Servings::new(4).unwrap())
            .with_ingredients(vec![
                Ingredient::new("250", Unit::Gram, "farine"),
                Ingredient::new("4", Unit::None, "oeufs"),
                Ingredient::new("une pincée", Unit::None, "sel"),
            ])
            .with_steps(vec!["Mélanger".into(), "Reposer 1h".into()])
            .with_category(Some("Desserts".into()));
        Recipe::from_fields(RecipeId::new(), fields, Utc::now())
    }

    #[test]
    fn test_scaled_copy() {
        let r = recipe();
        let scaled = scaled_copy(&r, Servings::new(6).unwrap(), true);
        assert_eq!(scaled.base_servings.get(), 6);
        assert_eq!(scaled.ingredients[0].quantity, "375");
        assert_eq!(scaled.ingredients[1].quantity, "6");
        assert_eq!(scaled.ingredients[2].quantity, "une pincée");
        assert_eq!(scaled.id, r.id);

        let same = scaled_copy(&r, Servings::new(6).unwrap(), false);
        assert_eq!(same, r);
    }

    #[test]
    fn test_render_md() {
        let md = render_md(&recipe(), Servings::new(2).unwrap());
        assert!(md.starts_with("# 🍳 Pâte à crêpes"));
        assert!(md.contains("**Servings:** 2"));
        assert!(md.contains("125"));
        assert!(md.contains("2. Reposer 1h"));
    }

    #[test]
    fn test_clean_steps_drops_blank() {
        let steps = vec!["  Cuire ".to_string(), "".to_string(), "   ".to_string()];
        assert_eq!(clean_steps(&steps), vec!["Cuire"]);
    }

    #[test]
    fn test_fields_from_args_requires_title() {
        let args = NewArgs {
            title: Some("   ".into()),
            servings: None,
            emoji: None,
            category: None,
            ingredients: vec![],
            steps: vec![],
            color: None,
            interactive: false,
        };
        assert!(fields_from_args(&Config::default(), &args).is_err());
    }

    #[test]
    fn test_fields_from_args_applies_defaults() {
        let args = NewArgs {
            title: Some("Soupe".into()),
            servings: None,
            emoji: None,
            category: Some("".into()),
            ingredients: vec!["1 l bouillon".into(), "2 carottes".into()],
            steps: vec![],
            color: None,
            interactive: false,
        };
        let fields = fields_from_args(&Config::default(), &args).unwrap();
        assert_eq!(fields.base_servings.get(), 4);
        assert_eq!(fields.emoji, "🍳");
        assert_eq!(fields.color, "bg-orange-100");
        assert_eq!(fields.category, None);
        assert_eq!(fields.ingredients[0].unit, Unit::Liter);
    }
}
