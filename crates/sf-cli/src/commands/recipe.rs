//! Recipe command: ask the generative service for a no-added-sugar recipe.

use std::io::Write;

use anyhow::{Context, Result, bail};

use sf_db::Database;
use sf_llm::Client;

use super::util;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    api_key: Option<&str>,
    api_url: Option<&str>,
    model: Option<&str>,
    user: &str,
    ingredients: &str,
) -> Result<()> {
    let user = util::parse_user(user)?;
    let ingredients = ingredients.trim();
    if ingredients.is_empty() {
        bail!("ingredients cannot be empty");
    }
    if db.get_user_row(&user)?.is_none() {
        bail!("unknown user: {user}");
    }

    let recipe_text = match api_key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => generate(key, api_url, model, ingredients),
        None => {
            tracing::debug!("no API key configured, using fallback recipe");
            sf_llm::fallback_recipe(ingredients)
        }
    };

    db.save_recipe(&user, ingredients, &recipe_text)?;
    writeln!(writer, "{recipe_text}")?;
    Ok(())
}

/// Calls the service, falling back to the static recipe on any failure.
fn generate(
    api_key: &str,
    api_url: Option<&str>,
    model: Option<&str>,
    ingredients: &str,
) -> String {
    let result = (|| -> Result<String> {
        let client = match api_url {
            Some(url) => Client::with_api_url(api_key, url),
            None => Client::new(api_key),
        }
        .context("failed to create LLM client")?;
        let runtime =
            tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
        let model = model.unwrap_or(sf_llm::DEFAULT_MODEL);
        runtime
            .block_on(client.generate_recipe(model, ingredients))
            .context("recipe generation failed")
    })();

    match result {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "recipe generation failed, using fallback");
            sf_llm::fallback_recipe(ingredients)
        }
    }
}
