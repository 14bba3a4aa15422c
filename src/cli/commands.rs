//! Command runners.

use colored::Colorize;
use serde_json::json;

use crate::app::AppContext;
use crate::catalog::model::{Category, Selection};
use crate::cli::Commands;
use crate::error::{LdxError, Result};
use crate::validate::WeightPreset;

pub async fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Sync => run_sync(ctx).await,
        Commands::Search {
            query,
            category,
            limit,
        } => run_search(ctx, query, category.as_deref(), *limit).await,
        Commands::Suggest { prompt, limit } => run_suggest(ctx, &prompt.join(" "), *limit).await,
        Commands::Validate {
            selections,
            preset,
        } => run_validate(ctx, selections, preset.as_deref()).await,
        Commands::Info { name } => run_info(ctx, name).await,
        Commands::Summary => run_summary(ctx).await,
        Commands::Tag {
            name,
            triggers,
            category,
            description,
        } => {
            run_tag(
                ctx,
                name,
                triggers.as_deref(),
                category.as_deref(),
                description.as_deref(),
            )
            .await
        }
    }
}

async fn run_sync(ctx: &AppContext) -> Result<()> {
    let outcome = ctx.catalog.sync().await?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.skipped {
        println!("{} {}", "Sync skipped:".yellow(), outcome.reason);
    } else {
        println!(
            "{} {} overlays updated ({})",
            "Sync complete:".green(),
            outcome.updated,
            outcome.reason
        );
    }
    if outcome.stale > 0 {
        println!(
            "{} {} local overlays no longer exist upstream",
            "Note:".yellow(),
            outcome.stale
        );
    }
    Ok(())
}

async fn run_search(
    ctx: &AppContext,
    query: &str,
    category: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let category = parse_category(category)?;
    if ctx.catalog.auto_sync() {
        ctx.catalog.ensure_synced().await?;
    }

    let results = ctx
        .catalog
        .search(query.to_string(), category, limit)
        .await?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No overlays matched '{query}'. Try a broader query or run `loradex sync`.");
        return Ok(());
    }

    for info in &results {
        println!(
            "{}  [{}]  {}",
            info.name.bold(),
            info.category,
            info.trigger_words.join(", ").dimmed()
        );
        if !info.description.is_empty() {
            println!("    {}", info.description);
        }
    }
    Ok(())
}

async fn run_suggest(ctx: &AppContext, prompt: &str, limit: Option<usize>) -> Result<()> {
    if ctx.catalog.auto_sync() {
        ctx.catalog.ensure_synced().await?;
    }

    let suggestions = ctx
        .catalog
        .suggest_for_prompt(prompt.to_string(), limit)
        .await?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    if suggestions.is_empty() {
        println!("No overlays look relevant to this prompt.");
        return Ok(());
    }

    for (rank, s) in suggestions.iter().enumerate() {
        println!(
            "{}. {}  {:.2}  [{} confidence]  weight {:.1}",
            rank + 1,
            s.name.bold(),
            s.score,
            s.confidence,
            s.recommended_weight
        );
        println!("   {}", s.reason.dimmed());
    }
    Ok(())
}

async fn run_validate(
    ctx: &AppContext,
    selections: &[String],
    preset: Option<&str>,
) -> Result<()> {
    let mut selection: Vec<Selection> = selections
        .iter()
        .map(|raw| parse_selection(raw))
        .collect::<Result<_>>()?;

    if let Some(preset) = preset {
        let preset: WeightPreset = preset
            .parse()
            .map_err(LdxError::Config)?;
        selection = ctx.catalog.optimize_weights(&selection, preset);
    }

    let validation = ctx.catalog.validate_combination(selection.clone()).await?;

    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "selection": selection,
                "warnings": validation.warnings,
                "recommendations": validation.recommendations,
            }))?
        );
        return Ok(());
    }

    for sel in &selection {
        println!("{}  weight {:.2}", sel.name.bold(), sel.weight);
    }
    if validation.is_clean() {
        println!("{}", "No conflicts detected.".green());
    }
    for warning in &validation.warnings {
        println!("{} {warning}", "Warning:".yellow());
    }
    for recommendation in &validation.recommendations {
        println!("{} {recommendation}", "Hint:".cyan());
    }
    Ok(())
}

async fn run_info(ctx: &AppContext, name: &str) -> Result<()> {
    let info = ctx
        .catalog
        .info(name.to_string())
        .await?
        .ok_or_else(|| LdxError::NotFound(name.to_string()))?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}  [{}]", info.name.bold(), info.category);
    println!("  file:     {}", info.filename);
    println!("  weight:   {:.2}", info.weight);
    println!("  triggers: {}", info.trigger_words.join(", "));
    if !info.description.is_empty() {
        println!("  about:    {}", info.description);
    }
    Ok(())
}

async fn run_summary(ctx: &AppContext) -> Result<()> {
    let summary = ctx.catalog.summary().await?;
    let state = ctx.catalog.sync_state().await?;

    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "summary": summary,
                "last_sync": state,
            }))?
        );
        return Ok(());
    }

    println!(
        "{} overlays across {} categories",
        summary.total,
        summary.categories.len()
    );
    for (category, count) in &summary.categories {
        println!("  {category:<12} {count}");
    }
    if !summary.top_trigger_words.is_empty() {
        let words: Vec<&str> = summary
            .top_trigger_words
            .iter()
            .map(|(word, _)| word.as_str())
            .collect();
        println!("top triggers: {}", words.join(", ").dimmed());
    }
    match state {
        Some(state) => println!(
            "last sync: {} ({} overlays, {}ms)",
            state.last_sync_check, state.overlay_count, state.sync_duration_ms
        ),
        None => println!("{}", "never synced - run `loradex sync`".yellow()),
    }
    Ok(())
}

async fn run_tag(
    ctx: &AppContext,
    name: &str,
    triggers: Option<&str>,
    category: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    let triggers: Option<Vec<String>> = triggers.map(|raw| {
        raw.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    });
    let category = parse_category(category)?;

    let changed = ctx
        .catalog
        .update_metadata(
            name.to_string(),
            triggers,
            category,
            description.map(String::from),
        )
        .await?;

    if !changed {
        return Err(LdxError::NotFound(name.to_string()));
    }

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&json!({"updated": name}))?);
    } else {
        println!("{} {name}", "Updated".green());
    }
    Ok(())
}

fn parse_category(raw: Option<&str>) -> Result<Option<Category>> {
    raw.map(|s| s.parse::<Category>().map_err(LdxError::Config))
        .transpose()
}

/// "name" or "name:weight"
fn parse_selection(raw: &str) -> Result<Selection> {
    match raw.rsplit_once(':') {
        Some((name, weight)) => {
            let weight: f64 = weight
                .parse()
                .map_err(|_| LdxError::Config(format!("bad weight in '{raw}'")))?;
            Ok(Selection {
                name: name.to_string(),
                weight,
            })
        }
        None => Ok(Selection {
            name: raw.to_string(),
            weight: 1.0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_with_and_without_weight() {
        let sel = parse_selection("neon_city:0.8").unwrap();
        assert_eq!(sel.name, "neon_city");
        assert!((sel.weight - 0.8).abs() < 1e-9);

        let sel = parse_selection("neon_city").unwrap();
        assert!((sel.weight - 1.0).abs() < 1e-9);

        assert!(parse_selection("neon_city:heavy").is_err());
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category(None).unwrap(), None);
        assert_eq!(
            parse_category(Some("style")).unwrap(),
            Some(Category::Style)
        );
        assert!(parse_category(Some("bogus")).is_err());
    }
}
