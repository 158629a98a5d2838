use std::future::ready;
use std::pin::Pin;

use serde_json::{Map, Value};
use tracing::Instrument;

use super::{Error, Tool, ToolDefinition, ToolOutput};

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    fn execute(
        &self,
        arguments: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send>>;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.0.name().to_owned(),
            description: self.0.description().to_owned(),
            input_schema: self.0.parameter_schema().clone(),
        }
    }

    fn execute(
        &self,
        arguments: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send>> {
        let input: T::Input =
            match serde_json::from_value(Value::Object(arguments)) {
                Ok(input) => input,
                Err(err) => {
                    let reason = format!("{err}");
                    return Box::pin(ready(ToolOutput::Err(
                        Error::invalid_input().with_reason(reason),
                    )));
                }
            };

        let span = debug_span!("tool execute", tool = self.0.name());
        Box::pin(self.0.execute(input).instrument(span))
    }
}
