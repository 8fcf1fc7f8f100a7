use chrono::{DateTime, Duration, Utc};
use herald_core::{Callback, Caller, Event, Mediator, Priority};
use herald_listener::{HandlerSpec, Listener, ListenerHandle};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SAMPLE_MESSAGE: &str = "Lorem [b]ipsum dolor sit amet[/b], consectetur adipiscing elit.\n\
Vestibulum dignissim, est at blandit suscipit, sapien leo [u]iaculis massa[/u] odio.\n\
For more information please visit [url]https://example.org/herald[/url]";

fn text(e: &Event) -> String {
    e.data().as_str().unwrap_or_default().to_string()
}

fn previous_text(e: &Event) -> String {
    e.previous_result()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn nl2br(s: &str) -> String {
    s.replace('\n', "<br />\n")
}

fn timestamp(e: &Event) -> Option<DateTime<Utc>> {
    e.data().as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// 默认格式化器：拼出整篇帖子，各字段通过嵌套发布交给其它处理器
struct Formatter;

impl Formatter {
    fn format_username(&self, e: &mut Event) -> Value {
        json!(text(e))
    }

    fn format_group(&self, e: &mut Event) -> Value {
        json!(text(e))
    }

    fn format_date(&self, e: &mut Event) -> Value {
        timestamp(e)
            .map(|d| json!(d.format("%B %-d, %Y %I:%M:%S %p").to_string()))
            .unwrap_or(Value::Null)
    }

    fn format_message(&self, e: &mut Event) -> Value {
        json!(nl2br(&text(e)))
    }

    fn create_post(&self, e: &mut Event) -> Value {
        let Some(mediator) = e.mediator().cloned() else {
            return Value::Null;
        };
        let field = |event: &str, key: &str| -> String {
            let data = e.data_field(key).cloned().unwrap_or(Value::Null);
            let out = mediator.publish(
                Event::builder()
                    .name(event)
                    .data(data)
                    .caller(Caller::new("Formatter"))
                    .build(),
            );
            match out {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            }
        };

        json!(format!(
            "<div style=\"padding: 9px 16px;border:1px solid #EEE;margin-bottom:16px;\">\
             <strong>Posted by</strong> {} ({})<br /><strong>Posted Date</strong> {}<br />{}</div>",
            field("formatUsername", "username"),
            field("formatGroup", "group"),
            field("formatDate", "date"),
            field("formatMessage", "message"),
        ))
    }
}

impl Listener for Formatter {
    fn handlers(self: &Arc<Self>) -> Vec<HandlerSpec> {
        vec![
            HandlerSpec::new("formatUsername", Callback::method(self.clone(), Formatter::format_username)),
            HandlerSpec::new("formatGroup", Callback::method(self.clone(), Formatter::format_group)),
            HandlerSpec::new("formatDate", Callback::method(self.clone(), Formatter::format_date)),
            HandlerSpec::new("formatMessage", Callback::method(self.clone(), Formatter::format_message)),
            HandlerSpec::new("createPost", Callback::method(self.clone(), Formatter::create_post)),
        ]
    }
}

/// 覆盖分组与日期的格式
struct BetterFormatter;

impl BetterFormatter {
    fn better_group(&self, e: &mut Event) -> Value {
        let group = text(e).to_lowercase();
        let styled = match group.as_str() {
            "admin" | "administrator" => "<span style=\"color:#F00;\">Administrator</span>".to_string(),
            "mod" | "moderator" => "<span style=\"color:#00A;\">Moderator</span>".to_string(),
            _ => group,
        };
        json!(styled)
    }

    fn better_date(&self, e: &mut Event) -> Value {
        timestamp(e)
            .map(|d| json!(d.format("%B %-d, %Y %I:%M:%S %p %Z").to_string()))
            .unwrap_or(Value::Null)
    }
}

impl Listener for BetterFormatter {
    fn handlers(self: &Arc<Self>) -> Vec<HandlerSpec> {
        vec![
            HandlerSpec::builder("formatGroup", Callback::method(self.clone(), BetterFormatter::better_group))
                .priority(Priority::Low)
                .build(),
            HandlerSpec::builder("formatDate", Callback::method(self.clone(), BetterFormatter::better_date))
                .priority(Priority::Low)
                .build(),
        ]
    }
}

/// 把 BBCode 标签转成 HTML
struct FancyExamplePlugin;

impl FancyExamplePlugin {
    fn format_message(&self, e: &mut Event) -> Value {
        let mut message = text(e);
        for (tag, open, close) in [
            ("b", "<span style=\"font-weight:bold\">", "</span>"),
            ("u", "<span style=\"text-decoration:underline\">", "</span>"),
        ] {
            message = message
                .replace(&format!("[{tag}]"), open)
                .replace(&format!("[/{tag}]"), close);
        }
        json!(nl2br(&expand_urls(&message)))
    }
}

fn expand_urls(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(start) = rest.find("[url]") {
        let Some(end) = rest[start..].find("[/url]") else {
            break;
        };
        let href = &rest[start + "[url]".len()..start + end];
        out.push_str(&rest[..start]);
        out.push_str(&format!("<a href=\"{href}\">{href}</a>"));
        rest = &rest[start + end + "[/url]".len()..];
    }
    out.push_str(rest);
    out
}

impl Listener for FancyExamplePlugin {
    fn handlers(self: &Arc<Self>) -> Vec<HandlerSpec> {
        vec![
            HandlerSpec::builder("formatMessage", Callback::method(self.clone(), FancyExamplePlugin::format_message))
                .priority(Priority::Low)
                .build(),
        ]
    }
}

/// 在默认结果上追加样式
struct Fancify;

impl Fancify {
    fn create_post(&self, e: &mut Event) -> Value {
        json!(previous_text(e).replace(
            "border:1px solid #EEE;",
            "border:1px solid #DADADA;background:#F1F1F1;font-family:Arial;font-size:15px;",
        ))
    }
}

impl Listener for Fancify {
    fn handlers(self: &Arc<Self>) -> Vec<HandlerSpec> {
        vec![
            HandlerSpec::builder("createPost", Callback::method(self.clone(), Fancify::create_post))
                .priority(Priority::Low)
                .build(),
        ]
    }
}

fn post(mediator: &Mediator, username: &str, group: &str, ago: Duration) -> String {
    let out = mediator.publish(Event::with_data(
        "createPost",
        json!({
            "username": username,
            "group": group,
            "date": (Utc::now() - ago).timestamp(),
            "message": SAMPLE_MESSAGE,
        }),
    ));
    out.and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("herald_core=info".parse()?))
        .init();

    let mediator = Mediator::new();
    let mut formatter = ListenerHandle::new(Formatter, mediator.clone());
    let mut fancy_plugin = ListenerHandle::new(FancyExamplePlugin, mediator.clone());
    let mut better = ListenerHandle::new(BetterFormatter, mediator.clone());
    let mut fancify = ListenerHandle::new(Fancify, mediator.clone());
    formatter.subscribe()?;
    fancy_plugin.subscribe()?;
    better.subscribe()?;
    fancify.subscribe()?;

    println!("With better formatting");
    println!("{}", post(&mediator, "David", "Administrator", Duration::zero()));
    println!("{}", post(&mediator, "John Doe", "Moderator", Duration::days(3)));

    // 只移除一个处理器
    mediator.unsubscribe(
        "formatGroup",
        Some(&Callback::method(better.listener().clone(), BetterFormatter::better_group)),
    )?;
    fancify.unsubscribe()?;

    println!("\nWithout the better formatting on group and post");
    println!("{}", post(&mediator, "AppleJuice", "Member", Duration::weeks(3)));

    fancy_plugin.unsubscribe()?;

    println!("\nAfter removing the fancy example plugin");
    println!("{}", post(&mediator, "Anonymous", "Donator", Duration::days(3 * 365)));

    formatter.unsubscribe()?;
    better.unsubscribe()?;
    Ok(())
}
