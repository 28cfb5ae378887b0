//! Stock form elements: plain `<input>` variants with escaped attributes and
//! values data-bound through the owning block's form context.

use std::rc::Rc;

use html_escape::encode_double_quoted_attribute;

use crate::render::{BlockRenderer, RenderArgs};
use crate::tree::Block;

use super::{ElementMap, Params};

/// Register the built-in element kinds on a factory map: `text`, `hidden`
/// and `submit`, each rendering as the matching `<input type="...">`.
pub fn register_stock_elements(map: &mut ElementMap) {
    for kind in ["text", "hidden", "submit"] {
        map.register(kind, |kind, name, params| {
            Block::with_renderer(Rc::new(InputRenderer {
                input_type: kind.to_string(),
                name: name.to_string(),
                params: params.clone(),
            }))
        });
    }
}

/// Renders one `<input>` element.
///
/// The value attribute resolves in two steps: a binding in the block's form
/// context wins, the `value` construction parameter is the fallback. All
/// other parameters are emitted as attributes verbatim (escaped).
struct InputRenderer {
    input_type: String,
    name: String,
    params: Params,
}

impl BlockRenderer for InputRenderer {
    fn render(&self, block: &Block, _args: &RenderArgs) -> String {
        let bound = block
            .form_context()
            .and_then(|ctx| ctx.value(&self.name));
        let value = bound.or_else(|| self.params.get("value").map(str::to_string));

        let mut out = String::from("<input");
        push_attr(&mut out, "type", &self.input_type);
        push_attr(&mut out, "name", &self.name);
        if let Some(value) = &value {
            push_attr(&mut out, "value", value);
        }
        for (key, param) in self.params.iter() {
            if key == "value" {
                continue;
            }
            push_attr(&mut out, key, param);
        }
        out.push_str(" />");
        out
    }
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(&encode_double_quoted_attribute(value));
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{ElementFactory, FormContext};
    use pretty_assertions::assert_eq;

    #[test]
    fn text_input_renders_with_params() {
        let map = ElementMap::with_stock_elements();
        let params = Params::new().with("class", "wide").with("value", "start");
        let element = map.create("text", "user", &params).unwrap();
        assert_eq!(
            element.to_string(),
            r#"<input type="text" name="user" value="start" class="wide" />"#
        );
    }

    #[test]
    fn attribute_values_are_escaped() {
        let map = ElementMap::with_stock_elements();
        let params = Params::new().with("value", r#"say "hi" & go"#);
        let element = map.create("hidden", "note", &params).unwrap();
        assert_eq!(
            element.to_string(),
            r#"<input type="hidden" name="note" value="say &quot;hi&quot; &amp; go" />"#
        );
    }

    #[test]
    fn context_binding_wins_over_value_param() {
        let map = ElementMap::with_stock_elements();
        let params = Params::new().with("value", "fallback");
        let element = map.create("text", "email", &params).unwrap();

        let mut form = Block::new();
        let ctx = Rc::new(FormContext::new("signup"));
        form.set_form_context(Rc::clone(&ctx));
        form.add(element);

        // binding after assembly still takes effect at render time
        ctx.bind("email", "ada@example.com");
        assert_eq!(
            form.to_string(),
            r#"<input type="text" name="email" value="ada@example.com" />"#
        );
    }

    #[test]
    fn submit_without_value_has_no_value_attribute() {
        let map = ElementMap::with_stock_elements();
        let element = map.create("submit", "go", &Params::new()).unwrap();
        assert_eq!(element.to_string(), r#"<input type="submit" name="go" />"#);
    }
}
