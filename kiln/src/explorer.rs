//! Navigation documents, the search index and the HTML pages.

use std::cmp::Ordering;
use std::path::Path;

use serde_json::{json, Map, Value};

use kiln_core::{metapack, Adapter, Configuration, IndexError, Page, Resolver};
use kiln_json_schema::{base_dialect_for, dialect_of, identify_loose, SchemaError};

use crate::html::{self, element, raw, Element, Node};

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                             navigation documents                             ║
║                            ¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯¯                            ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

fn breadcrumb_of(relative_path: &str) -> Value {
    let mut breadcrumb = Vec::new();
    let mut current = String::new();
    for part in relative_path.split('/').filter(|part| !part.is_empty()) {
        current.push('/');
        current.push_str(part);
        breadcrumb.push(json!({ "name": part, "path": current }));
    }
    Value::Array(breadcrumb)
}

fn page_metadata(page: &Page) -> Map<String, Value> {
    let mut metadata = Map::new();
    for (key, value) in [
        ("title", &page.title),
        ("description", &page.description),
        ("email", &page.email),
        ("github", &page.github),
        ("website", &page.website),
    ] {
        if let Some(value) = value {
            metadata.insert(key.to_owned(), Value::String(value.clone()));
        }
    }
    metadata
}

fn without_json_extension(path: &str) -> String {
    path.strip_suffix(".json").unwrap_or(path).to_owned()
}

/// Builds the navigation document of one schema from its materialised and
/// health artifacts.
///
/// # Errors
/// Fails when an artifact cannot be read or the dialect is undeterminable.
pub fn schema_nav(
    configuration: &Configuration,
    resolver: &Resolver,
    materialised_path: &Path,
    health_path: &Path,
    relative_path: &str,
) -> Result<Value, IndexError> {
    let pack = metapack::read_json_with_meta(materialised_path)?;
    let schema = pack.data;

    let identifier = identify_loose(&schema, None).unwrap_or_default().to_owned();
    let dialect = dialect_of(&schema, None).ok_or_else(|| {
        IndexError::Schema(SchemaError::UnknownDialect {
            identifier: identifier.clone(),
        })
    })?;
    let adapter = Adapter {
        resolver,
        callback: None,
    };
    let base_dialect = match base_dialect_for(&dialect) {
        Some(base) => base,
        None => kiln_json_schema::dialect::base_dialect_of_dialect(&dialect, &adapter)
            .map_err(IndexError::Schema)?,
    };

    let health = metapack::read_json(health_path)?;
    let score = health.get("score").cloned().unwrap_or(Value::from(100));

    let mut nav = Map::new();
    nav.insert("path".to_owned(), Value::String(relative_path.to_owned()));
    nav.insert("url".to_owned(), Value::String(format!("/{relative_path}")));
    nav.insert(
        "canonical".to_owned(),
        Value::String(format!("{}/{relative_path}", configuration.url_string())),
    );
    nav.insert("identifier".to_owned(), Value::String(identifier));
    nav.insert("dialect".to_owned(), Value::String(dialect));
    nav.insert(
        "baseDialect".to_owned(),
        Value::String(base_dialect.short_name().to_owned()),
    );
    nav.insert("bytes".to_owned(), Value::from(pack.meta.bytes));
    nav.insert("health".to_owned(), score);

    if let Some(title) = schema.get("title").and_then(Value::as_str) {
        nav.insert("title".to_owned(), Value::String(title.trim().to_owned()));
    }
    if let Some(description) = schema.get("description").and_then(Value::as_str) {
        nav.insert(
            "description".to_owned(),
            Value::String(description.trim().to_owned()),
        );
    }
    if let Some(examples) = schema.get("examples").filter(|value| value.is_array()) {
        nav.insert("examples".to_owned(), examples.clone());
    }

    let base = without_json_extension(relative_path);
    nav.insert("breadcrumb".to_owned(), breadcrumb_of(&base));
    nav.insert(
        "artifacts".to_owned(),
        json!({
            "schema": format!("schemas/{relative_path}"),
            "bundle": format!("schemas/{base}.bundle"),
            "unidentified": format!("schemas/{base}.unidentified"),
            "dependencies": format!("schemas/{base}.deps"),
            "health": format!("schemas/{base}.health"),
            "positions": format!("schemas/{base}.positions"),
            "locations": format!("schemas/{base}.locations"),
            "template": format!("schemas/{base}.template"),
        }),
    );

    Ok(Value::Object(nav))
}

/// Builds the navigation document of one directory from its children.
#[must_use]
pub fn directory_nav(
    configuration: &Configuration,
    directory: &str,
    subdirectories: &[String],
    schemas: &[(String, Value)],
) -> Value {
    let mut entries: Vec<Value> = Vec::new();

    for name in subdirectories {
        let path = if directory.is_empty() {
            name.clone()
        } else {
            format!("{directory}/{name}")
        };
        let mut entry = Map::new();
        entry.insert("name".to_owned(), Value::String(name.clone()));
        if let Some(page) = configuration.page(&path) {
            entry.extend(page_metadata(page));
        }
        entry.insert("type".to_owned(), Value::String("directory".to_owned()));
        entry.insert("path".to_owned(), Value::String(path.clone()));
        entry.insert("url".to_owned(), Value::String(format!("/{path}")));
        entries.push(Value::Object(entry));
    }

    for (name, nav) in schemas {
        let mut entry = nav.as_object().cloned().unwrap_or_default();
        // Children do not need their own breadcrumbs in a listing.
        entry.remove("breadcrumb");
        entry.insert("name".to_owned(), Value::String(name.clone()));
        entry.insert("type".to_owned(), Value::String("schema".to_owned()));
        if let Some(url) = entry.get("url").and_then(Value::as_str) {
            let trimmed = without_json_extension(url);
            entry.insert("url".to_owned(), Value::String(trimmed));
        }
        entries.push(Value::Object(entry));
    }

    sort_entries(&mut entries);

    let mut nav = Map::new();
    if let Some(page) = configuration.page(directory) {
        nav.extend(page_metadata(page));
    }
    nav.insert("entries".to_owned(), Value::Array(entries));
    nav.insert("path".to_owned(), Value::String(directory.to_owned()));
    nav.insert(
        "url".to_owned(),
        Value::String(if directory.is_empty() {
            "/".to_owned()
        } else {
            format!("/{directory}")
        }),
    );
    nav.insert(
        "canonical".to_owned(),
        Value::String(if directory.is_empty() {
            configuration.url_string()
        } else {
            format!("{}/{directory}", configuration.url_string())
        }),
    );
    nav.insert("breadcrumb".to_owned(), breadcrumb_of(directory));
    Value::Object(nav)
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   ordering                                   ║
║                                  ¯¯¯¯¯¯¯¯¯¯                                  ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

fn try_parse_version(name: &str) -> Option<semver::Version> {
    semver::Version::parse(name.strip_prefix('v').unwrap_or(name)).ok()
}

// Directories before schemas; within a kind, SemVer-aware names sort by
// version descending, everything else descending lexicographically.
fn sort_entries(entries: &mut [Value]) {
    entries.sort_by(|left, right| {
        let kind = |entry: &Value| {
            entry
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        let name = |entry: &Value| {
            entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        match kind(left).cmp(&kind(right)) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        let (left_name, right_name) = (name(left), name(right));
        match (try_parse_version(&left_name), try_parse_version(&right_name)) {
            (Some(left_version), Some(right_version)) => right_version.cmp(&left_version),
            _ => right_name.cmp(&left_name),
        }
    });
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                 search index                                 ║
║                                ¯¯¯¯¯¯¯¯¯¯¯¯¯¯                                ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Flattens schema navigation documents into `[url, title, description]`
/// triples, the ones with more metadata first, then by URL ascending.
#[must_use]
pub fn search_index(navs: &[Value]) -> Vec<Value> {
    let mut index: Vec<Value> = navs
        .iter()
        .map(|nav| {
            let url = nav
                .get("url")
                .and_then(Value::as_str)
                .map(without_json_extension)
                .unwrap_or_default();
            let field = |name: &str| {
                nav.get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned()
            };
            json!([url, field("title"), field("description")])
        })
        .collect();

    let score = |entry: &Value| -> usize {
        let filled = |index: usize| {
            entry
                .get(index)
                .and_then(Value::as_str)
                .is_some_and(|value| !value.is_empty())
        };
        usize::from(filled(1)) + usize::from(filled(2))
    };
    index.sort_by(|left, right| {
        score(right).cmp(&score(left)).then_with(|| {
            let url = |entry: &Value| {
                entry
                    .get(0)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned()
            };
            url(left).cmp(&url(right))
        })
    });
    index
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                  HTML pages                                  ║
║                                 ¯¯¯¯¯¯¯¯¯¯¯¯                                 ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

fn navigation_bar(configuration: &Configuration) -> Element {
    let mut bar = element("div").class("container-fluid px-4 py-1 align-items-center");
    bar = bar.child(
        element("a")
            .class("navbar-brand me-3 fw-bold")
            .attr("href", "/")
            .child(element("span").text(configuration.title.clone()))
            .child(element("span").class("fw-lighter").text(" Schemas")),
    );
    bar = bar.child(
        element("div")
            .class("flex-grow-1 position-relative")
            .child(
                element("input")
                    .class("form-control")
                    .attr("type", "search")
                    .attr("id", "search")
                    .attr("placeholder", "Search")
                    .attr("aria-label", "Search")
                    .attr("autocomplete", "off"),
            )
            .child(
                element("ul")
                    .class("d-none list-group position-absolute w-100 mt-2 shadow-sm")
                    .attr("id", "search-result"),
            ),
    );
    if let Some(action) = &configuration.action {
        let mut button = element("a")
            .class("ms-3 btn btn-dark")
            .attr("role", "button")
            .attr("href", action.url.clone());
        if !action.icon.is_empty() {
            button = button.child(element("i").class(format!("me-2 bi bi-{}", action.icon)));
        }
        bar = bar.child(button.text(action.title.clone()));
    }
    element("nav")
        .class("navbar navbar-expand border-bottom bg-body")
        .child(bar)
}

fn footer() -> Element {
    element("footer")
        .class("border-top text-secondary py-3 d-flex align-items-center justify-content-between")
        .child(
            element("small")
                .child(
                    element("a")
                        .attr("href", "https://github.com/kiln-registry/kiln")
                        .class("text-secondary")
                        .attr("target", "_blank")
                        .text("Kiln"),
                )
                .text(format!(" v{}", env!("CARGO_PKG_VERSION"))),
        )
}

fn page(
    configuration: &Configuration,
    canonical: Option<&str>,
    title: &str,
    description: &str,
    body: Vec<Node>,
) -> String {
    let mut head = element("head")
        .child(element("meta").attr("charset", "utf-8"))
        .child(
            element("meta")
                .attr("name", "referrer")
                .attr("content", "no-referrer"),
        )
        .child(
            element("meta")
                .attr("name", "viewport")
                .attr("content", "width=device-width, initial-scale=1.0"),
        )
        .child(element("title").text(title))
        .child(
            element("meta")
                .attr("name", "description")
                .attr("content", description),
        )
        .child(
            element("link")
                .attr("rel", "stylesheet")
                .attr("href", "/static/style.min.css"),
        )
        .child(
            element("link")
                .attr("rel", "icon")
                .attr("href", "/static/favicon.ico")
                .attr("sizes", "any"),
        );
    if let Some(canonical) = canonical {
        head = head.child(
            element("link")
                .attr("rel", "canonical")
                .attr("href", canonical),
        );
    }
    if let Some(fragment) = &configuration.head {
        head = head.child(raw(fragment.clone()));
    }

    let mut body_element = element("body")
        .class("h-100 d-flex flex-column")
        .child(navigation_bar(configuration));
    body_element = body_element.children(body);
    body_element = body_element.child(
        element("script")
            .attr("async", "")
            .attr("defer", "")
            .attr("src", "/static/main.min.js"),
    );
    body_element = body_element.child(
        element("div")
            .class("container-fluid px-4 mb-2")
            .child(footer()),
    );

    html::document(
        element("html")
            .class("h-100")
            .attr("lang", "en")
            .child(head)
            .child(body_element),
    )
}

fn breadcrumb(nav: &Value) -> Option<Element> {
    let parts = nav.get("breadcrumb")?.as_array()?;
    if parts.is_empty() {
        return None;
    }
    let mut list = element("ol").class("breadcrumb mb-0").child(
        element("li").class("breadcrumb-item").child(
            element("a")
                .attr("href", "/")
                .child(element("i").class("bi bi-arrow-left")),
        ),
    );
    for (index, part) in parts.iter().enumerate() {
        let name = part.get("name").and_then(Value::as_str).unwrap_or_default();
        let path = part.get("path").and_then(Value::as_str).unwrap_or_default();
        if index + 1 == parts.len() {
            list = list.child(
                element("li")
                    .class("breadcrumb-item active")
                    .attr("aria-current", "page")
                    .text(name),
            );
        } else {
            list = list.child(
                element("li")
                    .class("breadcrumb-item")
                    .child(element("a").attr("href", path).text(name)),
            );
        }
    }
    Some(
        element("nav")
            .class("container-fluid px-4 py-2 bg-light border-bottom font-monospace")
            .attr("aria-label", "breadcrumb")
            .child(list),
    )
}

fn dialect_badge(base_dialect: &str) -> Element {
    let colour = if base_dialect == "2020-12" {
        "text-bg-primary"
    } else {
        "text-bg-danger"
    };
    let mut label: String = base_dialect.to_owned();
    if let Some(first) = label.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    element("a")
        .attr(
            "href",
            format!("https://www.learnjsonschema.com/{base_dialect}"),
        )
        .attr("target", "_blank")
        .child(
            element("span")
                .class(format!("align-middle badge {colour}"))
                .text(label),
        )
}

fn file_manager(nav: &Value) -> Element {
    let mut body = element("tbody");
    let entries = nav
        .get("entries")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for entry in &entries {
        let kind = entry.get("type").and_then(Value::as_str).unwrap_or_default();
        let mut row = element("tr");

        let mut icon = element("td").class("text-nowrap");
        if kind == "directory" {
            icon = icon.child(element("i").class("bi bi-folder-fill"));
        } else {
            let base_dialect = entry
                .get("baseDialect")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            icon = icon.child(dialect_badge(base_dialect));
        }
        row = row.child(icon);

        let name = entry.get("name").and_then(Value::as_str).unwrap_or_default();
        let url = entry.get("url").and_then(Value::as_str).unwrap_or_default();
        row = row.child(
            element("td")
                .class("font-monospace text-nowrap")
                .child(element("a").attr("href", url).text(name)),
        );

        for field in ["title", "description"] {
            let value = entry.get(field).and_then(Value::as_str).unwrap_or("-");
            row = row.child(element("td").child(element("small").text(value)));
        }
        body = body.child(row);
    }

    element("div").class("container-fluid p-4 flex-grow-1").child(
        element("table")
            .class("table table-bordered border-light-subtle table-light")
            .child(
                element("thead").child(
                    element("tr")
                        .child(element("th").attr("scope", "col").attr("style", "width: 50px"))
                        .child(element("th").attr("scope", "col").text("Name"))
                        .child(element("th").attr("scope", "col").text("Title"))
                        .child(element("th").attr("scope", "col").text("Description")),
                ),
            )
            .child(body),
    )
}

/// The landing page: root navigation plus the optional hero fragment.
#[must_use]
pub fn index_page(configuration: &Configuration, nav: &Value) -> String {
    let mut body: Vec<Node> = Vec::new();
    if let Some(hero) = &configuration.hero {
        body.push(
            element("div")
                .class("container-fluid px-4")
                .child(
                    element("div")
                        .class("bg-light border border-light-subtle mt-4 px-3 py-3")
                        .child(raw(hero.clone())),
                )
                .into(),
        );
    }
    body.push(file_manager(nav).into());
    page(
        configuration,
        nav.get("canonical").and_then(Value::as_str),
        &format!("{} Schemas", configuration.title),
        &configuration.description,
        body,
    )
}

/// A directory listing page.
#[must_use]
pub fn directory_page(configuration: &Configuration, nav: &Value) -> String {
    let url = nav.get("url").and_then(Value::as_str).unwrap_or("/");
    let title = nav
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(url)
        .to_owned();
    let description = nav
        .get("description")
        .and_then(Value::as_str)
        .map_or_else(|| format!("Schemas located at {url}"), str::to_owned);
    let mut body: Vec<Node> = Vec::new();
    if let Some(breadcrumb) = breadcrumb(nav) {
        body.push(breadcrumb.into());
    }
    body.push(file_manager(nav).into());
    page(
        configuration,
        nav.get("canonical").and_then(Value::as_str),
        &title,
        &description,
        body,
    )
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} kB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

/// A schema detail page: metadata table, preview, dependency listing.
#[must_use]
pub fn schema_page(
    configuration: &Configuration,
    nav: &Value,
    dependencies: &Value,
    preview: &str,
) -> String {
    let url = nav.get("url").and_then(Value::as_str).unwrap_or_default();
    let identifier = nav
        .get("identifier")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let title = nav
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(url)
        .to_owned();

    let mut content = element("div");
    let mut heading = element("div");
    if nav.get("title").is_some() {
        heading = heading.child(element("h2").class("fw-bold h4").text(title.clone()));
    }
    if let Some(description) = nav.get("description").and_then(Value::as_str) {
        heading = heading.child(element("p").class("text-secondary").text(description));
    }
    heading = heading
        .child(
            element("a")
                .attr("href", url)
                .class("btn btn-primary me-2")
                .attr("role", "button")
                .text("Get JSON Schema"),
        )
        .child(
            element("a")
                .attr("href", format!("{url}?bundle=1"))
                .class("btn btn-secondary")
                .attr("role", "button")
                .text("Bundle"),
        );
    content = content.child(heading);

    let mut table = element("table").class("table table-bordered my-4");
    let row = |label: &str, value: Element| {
        element("tr")
            .child(
                element("th")
                    .attr("scope", "row")
                    .class("text-nowrap")
                    .text(label),
            )
            .child(element("td").child(value))
    };
    table = table.child(row(
        "Identifier",
        element("code").child(element("a").attr("href", identifier).text(identifier)),
    ));
    table = table.child(row(
        "Base Dialect",
        dialect_badge(
            nav.get("baseDialect")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        ),
    ));
    table = table.child(row(
        "Dialect",
        element("code").text(nav.get("dialect").and_then(Value::as_str).unwrap_or_default()),
    ));
    table = table.child(row(
        "Size",
        element("span").text(format_bytes(
            nav.get("bytes").and_then(Value::as_u64).unwrap_or_default(),
        )),
    ));
    table = table.child(row(
        "Health",
        element("span").text(format!(
            "{} / 100",
            nav.get("health").and_then(Value::as_u64).unwrap_or(100)
        )),
    ));
    content = content.child(table);

    content = content.child(
        element("pre")
            .class("bg-light p-3 border")
            .child(element("code").text(preview)),
    );

    // Dependencies, direct first.
    let edges = dependencies.as_array().cloned().unwrap_or_default();
    let direct = edges
        .iter()
        .filter(|edge| edge.get("from").and_then(Value::as_str) == Some(identifier))
        .count();
    let indirect = edges.len() - direct;
    content = content.child(element("h3").class("fw-bold h5 mt-4").text("Dependencies"));
    content = content.child(element("p").text(format!(
        "This schema has {direct} direct {} and {indirect} indirect {}.",
        plural(direct, "dependency", "dependencies"),
        plural(indirect, "dependency", "dependencies"),
    )));

    if !edges.is_empty() {
        let mut body = element("tbody");
        for edge in &edges {
            let mut row = element("tr");
            if edge.get("from").and_then(Value::as_str) == Some(identifier) {
                row = row.child(element("td").child(element("code").text(
                    edge.get("at").and_then(Value::as_str).unwrap_or_default(),
                )));
            } else {
                row = row.child(
                    element("td")
                        .child(element("span").class("badge text-bg-dark").text("Indirect")),
                );
            }
            let target = edge.get("to").and_then(Value::as_str).unwrap_or_default();
            let server = configuration.url_string();
            if let Some(local) = target.strip_prefix(&server) {
                let local = without_json_extension(local);
                row = row.child(element("td").child(
                    element("code").child(element("a").attr("href", local.clone()).text(local)),
                ));
            } else {
                row = row.child(element("td").child(element("code").text(target)));
            }
            body = body.child(row);
        }
        content = content.child(
            element("table")
                .class("table")
                .child(
                    element("thead").child(
                        element("tr")
                            .child(element("th").attr("scope", "col").text("Origin"))
                            .child(element("th").attr("scope", "col").text("Dependency")),
                    ),
                )
                .child(body),
        );
    }

    let mut body: Vec<Node> = Vec::new();
    if let Some(breadcrumb) = breadcrumb(nav) {
        body.push(breadcrumb.into());
    }
    body.push(
        element("div")
            .class("container-fluid p-4")
            .child(content)
            .into(),
    );

    let description = nav
        .get("description")
        .and_then(Value::as_str)
        .map_or_else(|| format!("Schemas located at {url}"), str::to_owned);
    page(
        configuration,
        nav.get("canonical").and_then(Value::as_str),
        &title,
        &description,
        body,
    )
}

/// The not-found page.
#[must_use]
pub fn not_found_page(configuration: &Configuration) -> String {
    let body = vec![element("div")
        .class("container-fluid p-4")
        .child(
            element("h2")
                .class("fw-bold")
                .text("Oops! What you are looking for is not here"),
        )
        .child(
            element("p")
                .class("lead")
                .text("Are you sure the link you got is correct?"),
        )
        .child(
            element("a")
                .attr("href", "/")
                .text("Get back to the home page"),
        )
        .into()];
    page(
        configuration,
        None,
        "Not Found",
        "What you are looking for is not here",
        body,
    )
}

fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                    tests                                     ║
║                                   ¯¯¯¯¯¯¯                                    ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str, name: &str) -> Value {
        json!({"type": kind, "name": name, "url": format!("/{name}")})
    }

    #[test]
    fn directories_sort_before_schemas() {
        let mut entries = vec![entry("schema", "a"), entry("directory", "z")];
        sort_entries(&mut entries);
        assert_eq!(entries[0]["type"], "directory");
    }

    #[test]
    fn semver_names_sort_descending_by_version() {
        let mut entries = vec![
            entry("directory", "v1.2.0"),
            entry("directory", "v1.10.0"),
            entry("directory", "v2.0.0"),
        ];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries
            .iter()
            .map(|entry| entry["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["v2.0.0", "v1.10.0", "v1.2.0"]);
    }

    #[test]
    fn non_semver_names_sort_descending_lexicographically() {
        let mut entries = vec![entry("schema", "alpha"), entry("schema", "beta")];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries
            .iter()
            .map(|entry| entry["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["beta", "alpha"]);
    }

    #[test]
    fn search_prefers_entries_with_metadata() {
        let navs = vec![
            json!({"url": "/z.json", "title": "Z", "description": "last letter"}),
            json!({"url": "/a.json"}),
            json!({"url": "/m.json", "title": "M"}),
        ];
        let index = search_index(&navs);
        assert_eq!(index[0][0], "/z");
        assert_eq!(index[1][0], "/m");
        assert_eq!(index[2][0], "/a");
    }

    #[test]
    fn breadcrumbs_accumulate_paths() {
        let breadcrumb = breadcrumb_of("example/nested/a");
        assert_eq!(
            breadcrumb,
            json!([
                {"name": "example", "path": "/example"},
                {"name": "nested", "path": "/example/nested"},
                {"name": "a", "path": "/example/nested/a"}
            ])
        );
    }
}
