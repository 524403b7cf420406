use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use relay_config::Config;
use relay_llm::provider::openrouter;
use relay_llm::{
    Adapter, AdapterOptions, AdapterRegistry, Assembled, LlmError, Message, ModelDescriptor, Request, StreamChunk,
    Tool, ToolCall, ToolCallAssembler,
};
use tokio::task::JoinHandle;

use crate::args::ChatArgs;

/// Build the adapter for `name` from its configured credentials
pub fn adapter(registry: &AdapterRegistry, config: &Config, name: &str) -> anyhow::Result<Arc<dyn Adapter>> {
    let canonical = registry.canonical_name(name);

    let provider = config
        .provider(name)
        .or_else(|| config.provider(&canonical))
        .ok_or_else(|| anyhow::anyhow!("provider '{name}' is not configured"))?;

    let mut options = AdapterOptions {
        api_key: provider.api_key.clone(),
        base_url: provider.base_url.clone(),
        headers: Vec::new(),
    };

    if canonical == openrouter::PROVIDER {
        options = openrouter::attribution(options, provider.referer.as_deref(), provider.title.as_deref());
    }

    Ok(registry.create(name, options)?)
}

pub async fn models(
    registry: &AdapterRegistry,
    config: &Config,
    provider: Option<&str>,
    live: bool,
) -> anyhow::Result<()> {
    let models = match (provider, live) {
        (Some(name), true) => adapter(registry, config, name)?.list_models().await,
        (Some(name), false) => registry.models_for(name),
        (None, _) => registry.all_models(),
    };

    let mut stdout = std::io::stdout().lock();
    for model in &models {
        writeln!(stdout, "{}", model_line(model))?;
    }

    Ok(())
}

fn model_line(model: &ModelDescriptor) -> String {
    let mut features = Vec::new();
    if model.supports_tools {
        features.push("tools");
    }
    if model.supports_json_mode {
        features.push("json");
    }

    format!(
        "{}\t{}\t{}\t{}\t{}",
        model.provider,
        model.id,
        model.display_name,
        model.context_window_tokens,
        features.join(",")
    )
}

pub async fn ping(registry: &AdapterRegistry, config: &Config, provider: &str) -> anyhow::Result<()> {
    let adapter = adapter(registry, config, provider)?;

    if !adapter.test_connection().await {
        anyhow::bail!("{} rejected the connection check", adapter.provider());
    }

    println!("{}: ok", adapter.provider());
    Ok(())
}

pub async fn chat(registry: &AdapterRegistry, config: &Config, args: &ChatArgs) -> anyhow::Result<()> {
    let adapter = adapter(registry, config, &args.provider)?;
    let request = chat_request(args)?;
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt = cancel_on_interrupt(Arc::clone(&adapter), Arc::clone(&interrupted));

    let result = if args.no_stream {
        send(adapter.as_ref(), &request).await
    } else {
        stream(adapter.as_ref(), &request.streaming(), &interrupted).await
    };

    interrupt.abort();
    result
}

fn chat_request(args: &ChatArgs) -> anyhow::Result<Request> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &args.system {
        messages.push(Message::system(system.as_str()));
    }
    messages.push(Message::user(args.prompt.as_str()));

    let mut request = Request::new(args.model.as_str(), messages);
    if let Some(temperature) = args.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        request = request.with_max_output_tokens(max_tokens);
    }
    if let Some(path) = &args.tools {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read tools {}: {e}", path.display()))?;
        let tools: Vec<Tool> = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse tools {}: {e}", path.display()))?;
        request = request.with_tools(tools);
    }

    request.validate(&args.provider)?;
    Ok(request)
}

/// Cancel the adapter's in-flight call on Ctrl-C
fn cancel_on_interrupt(adapter: Arc<dyn Adapter>, interrupted: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(provider = adapter.provider(), "interrupt received, cancelling");
            interrupted.store(true, Ordering::SeqCst);
            adapter.cancel();
        }
    })
}

async fn send(adapter: &dyn Adapter, request: &Request) -> anyhow::Result<()> {
    let response = match adapter.send(request).await {
        Ok(response) => response,
        Err(LlmError::Cancelled) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut stdout = std::io::stdout().lock();
    if !response.message.content.is_empty() {
        writeln!(stdout, "{}", response.message.content)?;
    }
    for call in response.tool_calls.iter().flatten() {
        writeln!(stdout, "{}", tool_call_line(call))?;
    }

    if let Some(usage) = response.usage {
        tracing::info!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            finish_reason = ?response.finish_reason,
            "completion finished"
        );
    }

    Ok(())
}

async fn stream(adapter: &dyn Adapter, request: &Request, interrupted: &AtomicBool) -> anyhow::Result<()> {
    let mut assembler = ToolCallAssembler::new(adapter.provider());
    let stdout = std::io::stdout();

    let mut sink = |chunk: StreamChunk| {
        if let Some(text) = &chunk.delta.content {
            let mut out = stdout.lock();
            if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
                tracing::warn!(error = %e, "failed to write to stdout");
            }
        }
        assembler.push(&chunk);
    };

    adapter.send_streaming(request, &mut sink).await?;

    let assembled = assemble(assembler, interrupted.load(Ordering::SeqCst))?;
    let mut out = std::io::stdout().lock();
    if !assembled.content.is_empty() {
        writeln!(out)?;
    }
    for call in &assembled.tool_calls {
        writeln!(out, "{}", tool_call_line(call))?;
    }

    Ok(())
}

/// An interrupted stream keeps what completed and drops calls cut off mid-arguments
fn assemble(assembler: ToolCallAssembler, interrupted: bool) -> Result<Assembled, LlmError> {
    if interrupted {
        Ok(assembler.finish_partial())
    } else {
        assembler.finish()
    }
}

fn tool_call_line(call: &ToolCall) -> String {
    format!("tool_call\t{}\t{}\t{}", call.id, call.name, call.arguments)
}
