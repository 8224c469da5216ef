use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use colored::Colorize;

/// Show today's usage against the configured daily limit
pub fn handle_usage(config: Config) -> Result<()> {
    let ctx = super::open_context(config)?;
    print_usage(&ctx);
    Ok(())
}

pub fn print_usage(ctx: &AppContext) {
    let usage = &ctx.config.usage;
    let info = ctx.usage_limiter().check_limit(usage.daily_limit);

    let remaining = if info.remaining == 0 {
        info.remaining.to_string().red()
    } else if info.remaining <= usage.low_quota_threshold {
        info.remaining.to_string().yellow()
    } else {
        info.remaining.to_string().green()
    };

    println!(
        "Used {} of {} today, {} remaining",
        info.used, info.limit, remaining
    );
}
