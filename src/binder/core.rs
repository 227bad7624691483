use crate::error::{BindError, FieldError};
use crate::iface::{
    Converter, FieldDecl, NestingStyle, ParamSource, ParameterSpec, ValueType,
};
use crate::server::{ServerRequest, ServerResponse, WebSocketChannel};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Most routes declare few parameters; keep the bound vector inline.
pub const MAX_INLINE_PARAMS: usize = 8;

/// One bound parameter value.
///
/// Scalars, sequences, structs, the error payload, and the authenticated
/// identity all bind as JSON values; the injected handles carry the live
/// objects themselves.
pub enum BoundValue {
    Json(Value),
    Request(Arc<dyn ServerRequest>),
    Response(Arc<dyn ServerResponse>),
    /// Raw body input stream; may only be consumed once
    Body(Box<dyn Read + Send>),
    /// Present only inside the upgraded-connection scope
    WebSocket(Box<dyn WebSocketChannel>),
}

impl BoundValue {
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            BoundValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            BoundValue::Request(_) => f.write_str("Request(..)"),
            BoundValue::Response(_) => f.write_str("Response(..)"),
            BoundValue::Body(_) => f.write_str("Body(..)"),
            BoundValue::WebSocket(_) => f.write_str("WebSocket(..)"),
        }
    }
}

/// Ordered bound parameters of one dispatch, in declaration order.
#[derive(Default)]
pub struct BoundParams {
    values: SmallVec<[(String, BoundValue); MAX_INLINE_PARAMS]>,
}

impl BoundParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: BoundValue) {
        self.values.push((name.into(), value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// JSON value of a parameter, `None` for injected handles.
    #[must_use]
    pub fn json(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(BoundValue::as_json)
    }

    #[must_use]
    pub fn json_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|(_, v)| v.as_json())
    }

    /// Take the upgraded WebSocket channel out of the parameter list.
    pub fn take_websocket(&mut self) -> Option<Box<dyn WebSocketChannel>> {
        let idx = self
            .values
            .iter()
            .position(|(_, v)| matches!(v, BoundValue::WebSocket(_)));
        idx.map(|i| match self.values.remove(i).1 {
            BoundValue::WebSocket(ch) => ch,
            // position() just matched this variant
            _ => unreachable!(),
        })
    }

    /// Take the raw body stream out of the parameter list.
    pub fn take_body(&mut self) -> Option<Box<dyn Read + Send>> {
        let idx = self
            .values
            .iter()
            .position(|(_, v)| matches!(v, BoundValue::Body(_)));
        idx.map(|i| match self.values.remove(i).1 {
            BoundValue::Body(r) => r,
            _ => unreachable!(),
        })
    }

    /// Replace the value bound for `name`.
    pub fn replace(&mut self, name: &str, value: BoundValue) {
        if let Some(slot) = self.values.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Everything the binder may draw from for one dispatch.
pub struct BindInput<'a> {
    /// Query-string and form fields, merged (form wins on collision)
    pub fields: &'a HashMap<String, String>,
    /// Path placeholders captured by the router
    pub path_params: &'a HashMap<String, String>,
    /// Authenticated identity, when the auth hook ran
    pub auth: Option<&'a Value>,
    /// Typed error payload during an error-recovery re-dispatch
    pub error_payload: Option<&'a Value>,
    pub request: &'a Arc<dyn ServerRequest>,
    pub response: &'a Arc<dyn ServerResponse>,
}

/// Merge query and form fields into the binder's field map. Form fields win
/// on collision, matching the submit-over-URL precedence of form posts.
#[must_use]
pub fn gather_fields(req: &dyn ServerRequest) -> HashMap<String, String> {
    let mut fields = req.query();
    fields.extend(req.form());
    fields
}

/// Produce the value for one parameter spec, or fail with a structured
/// error. Source rules apply in the fixed priority order; see the module
/// docs for the full list.
pub fn bind_param(
    spec: &ParameterSpec,
    nesting: NestingStyle,
    input: &BindInput<'_>,
) -> Result<BoundValue, BindError> {
    if spec.source == ParamSource::AuthInfo {
        return match input.auth {
            Some(v) => Ok(BoundValue::Json(v.clone())),
            None => Err(BindError::Field(FieldError::new(
                spec.name.clone(),
                "no authenticated identity available",
            ))),
        };
    }

    if let Some(compute) = &spec.compute {
        let value = compute(input.request.as_ref(), input.response.as_ref()).map_err(|err| {
            BindError::Field(
                FieldError::new(spec.name.clone(), "computed parameter failed")
                    .with_debug(format!("{err:#}")),
            )
        })?;
        return Ok(BoundValue::Json(value));
    }

    match spec.source {
        ParamSource::ErrorSlot => {
            let value = input
                .error_payload
                .cloned()
                .or_else(|| spec.default.clone())
                .unwrap_or(Value::Null);
            Ok(BoundValue::Json(value))
        }
        ParamSource::Request => Ok(BoundValue::Request(Arc::clone(input.request))),
        ParamSource::Response => Ok(BoundValue::Response(Arc::clone(input.response))),
        ParamSource::Body => {
            let reader = input.request.body_reader().map_err(|err| {
                BindError::Field(
                    FieldError::new(spec.name.clone(), "request body unavailable")
                        .with_debug(format!("{err:#}")),
                )
            })?;
            Ok(BoundValue::Body(reader))
        }
        // Bound only after the transport upgrade, inside Invoke; a JSON
        // null placeholder keeps the declaration order intact until then.
        ParamSource::WebSocket => Ok(BoundValue::Json(Value::Null)),
        ParamSource::RouteParam => bind_route_param(spec, input),
        ParamSource::QueryOrForm | ParamSource::Auto => {
            bind_request_field(spec, nesting, input.fields)
        }
        // Handled above
        ParamSource::AuthInfo => Err(BindError::Field(FieldError::new(
            spec.name.clone(),
            "no authenticated identity available",
        ))),
    }
}

/// Bind a marker-prefixed parameter from the router's placeholder map.
///
/// A conversion failure here means a different overlapping route may be the
/// intended match, so it disqualifies the route instead of raising a field
/// error. Absence is a field error unless a default or optional applies.
fn bind_route_param(
    spec: &ParameterSpec,
    input: &BindInput<'_>,
) -> Result<BoundValue, BindError> {
    let lookup = spec.name.trim_start_matches('_');
    match input.path_params.get(lookup) {
        Some(raw) => match convert_leaf(&spec.name, raw, &spec.ty) {
            Ok(v) => Ok(BoundValue::Json(v)),
            Err(err) => {
                debug!(param = lookup, reason = %err.message, "placeholder conversion failed; route disqualified");
                Err(BindError::PlaceholderMismatch {
                    name: lookup.to_string(),
                    reason: err.message,
                })
            }
        },
        None => {
            if let Some(default) = &spec.default {
                Ok(BoundValue::Json(default.clone()))
            } else if spec.optional {
                Ok(BoundValue::Json(Value::Null))
            } else {
                Err(BindError::Field(FieldError::new(
                    spec.name.clone(),
                    format!("missing route parameter '{lookup}'"),
                )))
            }
        }
    }
}

/// Bind from query/form fields with structured decomposition.
fn bind_request_field(
    spec: &ParameterSpec,
    nesting: NestingStyle,
    fields: &HashMap<String, String>,
) -> Result<BoundValue, BindError> {
    match bind_field_value(&spec.name, &spec.ty, nesting, fields).map_err(BindError::Field)? {
        Some(v) => Ok(BoundValue::Json(v)),
        None => {
            if let Some(default) = &spec.default {
                Ok(BoundValue::Json(default.clone()))
            } else if spec.optional {
                Ok(BoundValue::Json(Value::Null))
            } else {
                Err(BindError::Field(FieldError::new(
                    spec.name.clone(),
                    format!("missing required field '{}'", spec.name),
                )))
            }
        }
    }
}

/// Recursive field binding. `Ok(None)` means the value is absent; the
/// caller decides between default, null, and a required-field error.
fn bind_field_value(
    name: &str,
    ty: &ValueType,
    nesting: NestingStyle,
    fields: &HashMap<String, String>,
) -> Result<Option<Value>, FieldError> {
    match ty {
        // Checkbox semantics: presence is the value, never absent.
        ValueType::Bool => Ok(Some(Value::Bool(fields.contains_key(name)))),
        ValueType::Seq(inner) => bind_sequence(name, inner, nesting, fields),
        ValueType::Struct(members) => bind_struct(name, members, nesting, fields),
        leaf => match fields.get(name) {
            Some(raw) => convert_leaf(name, raw, leaf).map(Some),
            None => Ok(None),
        },
    }
}

/// Collect `<name>_<index>` for index 0, 1, 2, … until the first missing
/// index. A gap terminates collection; later indices are ignored.
fn bind_sequence(
    name: &str,
    inner: &ValueType,
    nesting: NestingStyle,
    fields: &HashMap<String, String>,
) -> Result<Option<Value>, FieldError> {
    let mut items = Vec::new();
    for index in 0.. {
        let element = format!("{name}_{index}");
        if !subtree_present(fields, &element, nesting) {
            break;
        }
        match bind_field_value(&element, inner, nesting, fields)? {
            Some(v) => items.push(v),
            None => break,
        }
    }
    if items.is_empty() && !subtree_present(fields, &format!("{name}_0"), nesting) {
        Ok(None)
    } else {
        Ok(Some(Value::Array(items)))
    }
}

/// Decompose a struct into one field per member named
/// `<name><sep><member>`.
///
/// Presence policy: the struct counts as present when any member field is
/// present. Members with their own default or optional marker fill in as
/// usual; a missing member without either raises a field error naming the
/// member's full field name. A wholly absent struct is reported absent and
/// left to the caller's optional/default handling.
fn bind_struct(
    name: &str,
    members: &[FieldDecl],
    nesting: NestingStyle,
    fields: &HashMap<String, String>,
) -> Result<Option<Value>, FieldError> {
    let sep = nesting.separator();
    let any_present = members.iter().any(|m| {
        subtree_present(fields, &format!("{name}{sep}{}", m.name), nesting)
    });
    if !any_present {
        return Ok(None);
    }

    let mut object = Map::new();
    for member in members {
        let child = format!("{name}{sep}{}", member.name);
        match bind_field_value(&child, &member.ty, nesting, fields)? {
            Some(v) => {
                object.insert(member.name.clone(), v);
            }
            None => {
                if let Some(default) = &member.default {
                    object.insert(member.name.clone(), default.clone());
                } else if member.optional {
                    object.insert(member.name.clone(), Value::Null);
                } else {
                    return Err(FieldError::new(
                        child.clone(),
                        format!("missing required field '{child}'"),
                    ));
                }
            }
        }
    }
    Ok(Some(Value::Object(object)))
}

/// Whether any request field belongs to the subtree rooted at `prefix`:
/// the field itself, a nested member, or a sequence element.
fn subtree_present(fields: &HashMap<String, String>, prefix: &str, nesting: NestingStyle) -> bool {
    let sep = nesting.separator();
    fields.keys().any(|k| {
        k == prefix
            || k.strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(sep) || rest.starts_with('_'))
    })
}

/// Convert one leaf field through the capability cascade: the type's
/// validating parser, then its plain parser, then the generic conversion.
fn convert_leaf(field: &str, raw: &str, ty: &ValueType) -> Result<Value, FieldError> {
    match ty {
        ValueType::Str => Ok(Value::String(raw.to_string())),
        ValueType::Int => raw.parse::<i64>().map(Value::from).map_err(|e| {
            FieldError::new(field, format!("invalid integer: {e}"))
                .with_debug(format!("raw value '{raw}'"))
        }),
        ValueType::Float => raw.parse::<f64>().map(Value::from).map_err(|e| {
            FieldError::new(field, format!("invalid number: {e}"))
                .with_debug(format!("raw value '{raw}'"))
        }),
        ValueType::Bool => raw.parse::<bool>().map(Value::from).map_err(|e| {
            FieldError::new(field, format!("invalid boolean: {e}"))
                .with_debug(format!("raw value '{raw}'"))
        }),
        ValueType::Custom(converter) => convert_custom(field, raw, converter),
        ValueType::Seq(_) | ValueType::Struct(_) => Err(FieldError::new(
            field,
            "composite value cannot convert from a single field",
        )),
    }
}

fn convert_custom(field: &str, raw: &str, converter: &Converter) -> Result<Value, FieldError> {
    if let Some(validating) = converter.validating {
        return validating(raw).map_err(|message| {
            FieldError::new(field, message).with_debug(format!(
                "raw value '{raw}' rejected by {} validator",
                converter.type_name
            ))
        });
    }
    if let Some(plain) = converter.plain {
        return plain(raw).ok_or_else(|| {
            FieldError::new(field, format!("invalid {} value", converter.type_name))
                .with_debug(format!("raw value '{raw}'"))
        });
    }
    Ok(Value::String(raw.to_string()))
}

/// Compare every confirmation parameter against its target after all
/// parameters are bound. Equality includes matching absence: two nulls
/// (both absent) confirm each other.
pub fn check_confirmations(
    specs: &[ParameterSpec],
    params: &BoundParams,
) -> Result<(), BindError> {
    for (index, spec) in specs.iter().enumerate() {
        let Some(target) = spec.confirms else {
            continue;
        };
        let own = params.json_at(index);
        let other = params.json_at(target);
        if own != other {
            return Err(BindError::ConfirmationMismatch {
                field: spec.name.clone(),
            });
        }
    }
    Ok(())
}
