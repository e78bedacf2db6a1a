//! XML execution plan parser.
//!
//! ```xml
//! <execution-plan>
//!   <event-receiver name="R" parallel="1">
//!     <streams><stream>define stream s1 (userId string);</stream></streams>
//!   </event-receiver>
//!   <event-processor name="P" parallel="2" enforceParallelism="true">
//!     <input-streams><stream partition="userId">define stream s1 (userId string);</stream></input-streams>
//!     <queries>from s1 select userId insert into s2;</queries>
//!     <output-streams><stream>define stream s2 (userId string);</stream></output-streams>
//!   </event-processor>
//!   <event-publisher name="W" parallel="1">
//!     <input-streams><stream>define stream s2 (userId string);</stream></input-streams>
//!   </event-publisher>
//!   <trigger name="tick">
//!     <trigger-definition>define trigger tick at every 5 sec;</trigger-definition>
//!     <output-stream>tick</output-stream>
//!   </trigger>
//! </execution-plan>
//! ```
//!
//! Components come out section by section: receivers, processors,
//! publishers, then triggers, each in document order.

use serde::Deserialize;
use tributary_core::{
    Component, ComponentKind, CoreError, CoreResult, ExecutionPlan, InputStream, OutputStream,
    Parallelism, SchemaResolver,
};

/// Prefix of the component name generated for a trigger
pub const TRIGGER_PREFIX: &str = "trigger_";

#[derive(Debug, Deserialize)]
struct PlanDocument {
    #[serde(rename = "event-receiver", default)]
    receivers: Vec<ReceiverElement>,
    #[serde(rename = "event-processor", default)]
    processors: Vec<ProcessorElement>,
    #[serde(rename = "event-publisher", default)]
    publishers: Vec<PublisherElement>,
    #[serde(rename = "trigger", default)]
    triggers: Vec<TriggerElement>,
}

#[derive(Debug, Deserialize)]
struct ReceiverElement {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@parallel")]
    parallel: Option<String>,
    streams: Option<StreamList>,
}

#[derive(Debug, Deserialize)]
struct ProcessorElement {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@parallel")]
    parallel: Option<String>,
    #[serde(rename = "@enforceParallelism")]
    enforce_parallelism: Option<String>,
    #[serde(rename = "input-streams")]
    input_streams: Option<StreamList>,
    #[serde(rename = "table-definitions")]
    table_definitions: Option<String>,
    queries: Option<String>,
    #[serde(rename = "output-streams")]
    output_streams: Option<StreamList>,
}

#[derive(Debug, Deserialize)]
struct PublisherElement {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@parallel")]
    parallel: Option<String>,
    #[serde(rename = "input-streams")]
    input_streams: Option<StreamList>,
    #[serde(rename = "table-definitions")]
    table_definitions: Option<String>,
    queries: Option<String>,
    #[serde(rename = "output-streams")]
    output_streams: Option<StreamList>,
}

#[derive(Debug, Deserialize)]
struct TriggerElement {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "trigger-definition")]
    definition: Option<String>,
    #[serde(rename = "output-stream")]
    output_stream: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamList {
    #[serde(rename = "stream", default)]
    streams: Vec<StreamElement>,
}

#[derive(Debug, Deserialize)]
struct StreamElement {
    #[serde(rename = "@partition")]
    partition: Option<String>,
    #[serde(rename = "$text", default)]
    definition: String,
}

/// Parse an XML plan document into an execution plan
///
/// # Errors
///
/// Returns [`CoreError::Parse`] for malformed XML, and configuration,
/// parallelism or stream definition errors for invalid components
pub fn parse_plan<R: SchemaResolver>(document: &str, resolver: &R) -> CoreResult<ExecutionPlan> {
    let doc: PlanDocument = quick_xml::de::from_str(document).map_err(|e| CoreError::Parse {
        message: e.to_string(),
    })?;
    let parser = ComponentParser { resolver };

    let mut components = Vec::with_capacity(
        doc.receivers.len() + doc.processors.len() + doc.publishers.len() + doc.triggers.len(),
    );
    for element in doc.receivers {
        components.push(parser.receiver(element)?);
    }
    for element in doc.processors {
        components.push(parser.processor(element)?);
    }
    for element in doc.publishers {
        components.push(parser.publisher(element)?);
    }
    for element in doc.triggers {
        components.push(parser.trigger(element)?);
    }

    ExecutionPlan::new(components)
}

struct ComponentParser<'r, R> {
    resolver: &'r R,
}

impl<R: SchemaResolver> ComponentParser<'_, R> {
    fn receiver(&self, element: ReceiverElement) -> CoreResult<Component> {
        let name = required(element.name, "event-receiver", "@name")?;
        let mut component = Component::new(&name, ComponentKind::Source)
            .with_parallelism(parallelism(&name, element.parallel)?);

        // Receivers pass imported streams straight through.
        for stream in element.streams.unwrap_or_default().streams {
            let definition = stream.definition.trim().to_string();
            let id = self.resolver.resolve(&definition)?.id;
            component.add_output(
                id,
                OutputStream {
                    definition: Some(definition),
                },
            )?;
        }
        Ok(component)
    }

    fn processor(&self, element: ProcessorElement) -> CoreResult<Component> {
        let name = required(element.name, "event-processor", "@name")?;
        let queries = required(element.queries, &name, "queries")?;
        let query = join_query(element.table_definitions, queries);

        let mut component = Component::processor(&name, query)
            .with_parallelism(parallelism(&name, element.parallel)?);
        component.enforce_parallelism = element
            .enforce_parallelism
            .is_some_and(|v| v.trim() == "true");

        self.add_inputs(&mut component, element.input_streams)?;
        self.add_outputs(&mut component, element.output_streams)?;
        Ok(component)
    }

    fn publisher(&self, element: PublisherElement) -> CoreResult<Component> {
        let name = required(element.name, "event-publisher", "@name")?;
        let query = element
            .queries
            .map(|q| join_query(element.table_definitions, q));

        let mut component = Component::new(&name, ComponentKind::Sink { query })
            .with_parallelism(parallelism(&name, element.parallel)?);

        self.add_inputs(&mut component, element.input_streams)?;
        self.add_outputs(&mut component, element.output_streams)?;
        Ok(component)
    }

    fn trigger(&self, element: TriggerElement) -> CoreResult<Component> {
        let trigger = required(element.name, "trigger", "@name")?;
        let name = format!("{}{}", TRIGGER_PREFIX, trigger);
        let definition = required(element.definition, &name, "trigger-definition")?;
        let output = required(element.output_stream, &name, "output-stream")?;

        let mut component = Component::trigger(name, trigger, definition);
        component.add_output(output, OutputStream::default())?;
        Ok(component)
    }

    fn add_inputs(&self, component: &mut Component, list: Option<StreamList>) -> CoreResult<()> {
        for stream in list.unwrap_or_default().streams {
            let definition = stream.definition.trim().to_string();
            let id = self.resolver.resolve(&definition)?.id;
            let partition = stream
                .partition
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty());
            component.add_input(
                id,
                InputStream {
                    definition,
                    partition,
                },
            )?;
        }
        Ok(())
    }

    fn add_outputs(&self, component: &mut Component, list: Option<StreamList>) -> CoreResult<()> {
        for stream in list.unwrap_or_default().streams {
            let definition = stream.definition.trim().to_string();
            let id = self.resolver.resolve(&definition)?.id;
            component.add_output(
                id,
                OutputStream {
                    definition: Some(definition),
                },
            )?;
        }
        Ok(())
    }
}

fn required(value: Option<String>, component: &str, what: &str) -> CoreResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::configuration(component, format!("missing {}", what)))
}

fn parallelism(component: &str, raw: Option<String>) -> CoreResult<Parallelism> {
    let raw = required(raw, component, "@parallel")?;
    Parallelism::parse(component, &raw)
}

fn join_query(table_definitions: Option<String>, queries: String) -> String {
    match table_definitions.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(tables) => format!("{}\n{}", tables, queries.trim()),
        None => queries.trim().to_string(),
    }
}
