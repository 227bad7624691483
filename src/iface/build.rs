use super::types::{
    EntryAction, ErrorDisplay, ErrorTarget, InterfaceDecl, MethodKind, ParamDecl, ParamSource,
    ParameterSpec, RouteEntry, RouteTable, WebInterface, WebInterfaceSettings, ERROR_SLOT,
    ROUTE_PARAM_MARKER,
};
use crate::dispatcher::{BoundRoute, DispatchConfig, Dispatcher};
use crate::error::RouteConfigError;
use crate::naming::{self, CaseStyle};
use crate::router::{RouteBinding, Router};
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// URL-segment-safe concatenation: duplicate slashes collapse, a trailing
/// slash or `*` wildcard on the segment is preserved, and the root segment
/// `"/"` yields the prefix itself.
#[must_use]
pub fn join_url(prefix: &str, segment: &str) -> String {
    let trailing_slash = segment.len() > 1 && segment.ends_with('/');
    let mut out = String::with_capacity(prefix.len() + segment.len() + 2);
    out.push('/');
    for part in prefix.split('/').chain(segment.split('/')) {
        if part.is_empty() {
            continue;
        }
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(part);
    }
    if trailing_slash && out.len() > 1 {
        out.push('/');
    }
    out
}

/// Toggle the trailing slash of a non-root, non-wildcard path.
fn complementary_path(path: &str) -> String {
    if let Some(stripped) = path.strip_suffix('/') {
        stripped.to_string()
    } else {
        format!("{path}/")
    }
}

/// Build the flattened route table for an interface tree.
///
/// Runs once at registration. Derivation per method: the explicit
/// [`super::RouteConfig`] path/verb overrides when present, else the naming
/// resolver; nested-interface methods recurse with an extended prefix
/// instead of producing a leaf route. Building twice from the same
/// declarations yields an identical ordered entry list.
pub fn build_route_table(
    iface: &dyn WebInterface,
    style: CaseStyle,
    settings: &WebInterfaceSettings,
) -> Result<RouteTable, RouteConfigError> {
    let mut entries: Vec<RouteEntry> = Vec::new();
    build_level(
        &mut entries,
        &iface.describe(),
        &settings.url_prefix,
        style,
        settings.ignore_trailing_slash,
    )?;
    Ok(RouteTable {
        entries: entries.into_iter().map(Arc::new).collect(),
    })
}

fn build_level(
    entries: &mut Vec<RouteEntry>,
    decl: &InterfaceDecl,
    prefix: &str,
    style: CaseStyle,
    ignore_trailing_slash: bool,
) -> Result<(), RouteConfigError> {
    let level_prefix = match &decl.base_path {
        Some(base) => join_url(prefix, base),
        None => join_url(prefix, "/"),
    };

    // Error-display targets resolve within this interface level, after all
    // of its leaf entries exist.
    let mut level_names: HashMap<String, usize> = HashMap::new();
    let mut pending: Vec<(usize, String, ErrorDisplay)> = Vec::new();

    for method_decl in &decl.methods {
        if method_decl.config.no_route {
            debug!(method = %method_decl.name, "method excluded from routing");
            continue;
        }

        let (derived_verb, derived_segment) = naming::resolve(&method_decl.name, style);
        let segment = method_decl
            .config
            .path
            .clone()
            .unwrap_or(derived_segment);
        let verb = method_decl
            .config
            .method
            .clone()
            .unwrap_or(derived_verb);
        let path = join_url(&level_prefix, &segment);

        match &method_decl.kind {
            MethodKind::Nested(nested) => {
                if !method_decl.params.is_empty() {
                    return Err(RouteConfigError::NestedWithParams {
                        method: method_decl.name.clone(),
                    });
                }
                let sub = nested();
                debug!(method = %method_decl.name, prefix = %path, "recursing into nested interface");
                build_level(entries, &sub.describe(), &path, style, ignore_trailing_slash)?;
            }
            MethodKind::Handler(handler) => {
                let (params, websocket) =
                    resolve_params(&method_decl.name, &method_decl.params)?;
                let index = entries.len();
                entries.push(RouteEntry {
                    method: verb.clone(),
                    path: path.clone(),
                    source_method: method_decl.name.clone(),
                    params: params.clone(),
                    action: EntryAction::Invoke(Arc::clone(handler)),
                    error_display: None,
                    content_type: method_decl.config.content_type.clone(),
                    nesting_style: method_decl.config.nesting_style,
                    websocket,
                });
                level_names.insert(method_decl.name.clone(), index);
                if let Some(display) = &method_decl.config.error_display {
                    pending.push((index, method_decl.name.clone(), display.clone()));
                }

                if ignore_trailing_slash && path != "/" && !path.ends_with('*') {
                    let alt = complementary_path(&path);
                    if verb == Method::GET {
                        // The alternate GET path canonicalizes via redirect
                        // instead of re-executing the handler.
                        entries.push(RouteEntry {
                            method: verb.clone(),
                            path: alt,
                            source_method: method_decl.name.clone(),
                            params: Vec::new(),
                            action: EntryAction::RedirectTo(path.clone()),
                            error_display: None,
                            content_type: None,
                            nesting_style: method_decl.config.nesting_style,
                            websocket: false,
                        });
                    } else {
                        let alt_index = entries.len();
                        entries.push(RouteEntry {
                            method: verb.clone(),
                            path: alt,
                            source_method: method_decl.name.clone(),
                            params,
                            action: EntryAction::Invoke(Arc::clone(handler)),
                            error_display: None,
                            content_type: method_decl.config.content_type.clone(),
                            nesting_style: method_decl.config.nesting_style,
                            websocket,
                        });
                        if let Some(display) = &method_decl.config.error_display {
                            pending.push((alt_index, method_decl.name.clone(), display.clone()));
                        }
                    }
                }
            }
        }
    }

    for (index, method, display) in pending {
        let target = *level_names.get(&display.target).ok_or_else(|| {
            RouteConfigError::UnknownErrorDisplay {
                method: method.clone(),
                target: display.target.clone(),
            }
        })?;
        entries[index].error_display = Some(ErrorTarget {
            entry: target,
            map: display.map,
        });
    }

    Ok(())
}

/// Resolve declared parameters into runtime specs.
///
/// `Auto` sources resolve by name (reserved error slot, marker prefix, else
/// query/form); confirmation references are validated here: the target must
/// exist in the same method, differ from the confirming parameter, and
/// match its optionality.
fn resolve_params(
    method: &str,
    decls: &[ParamDecl],
) -> Result<(Vec<ParameterSpec>, bool), RouteConfigError> {
    let mut specs = Vec::with_capacity(decls.len());
    let mut websocket_count = 0usize;

    for decl in decls {
        let source = match decl.source {
            ParamSource::Auto => {
                if decl.name == ERROR_SLOT {
                    ParamSource::ErrorSlot
                } else if decl.name.starts_with(ROUTE_PARAM_MARKER) {
                    ParamSource::RouteParam
                } else {
                    ParamSource::QueryOrForm
                }
            }
            other => other,
        };
        if source == ParamSource::WebSocket {
            websocket_count += 1;
        }
        specs.push(ParameterSpec {
            name: decl.name.clone(),
            source,
            ty: decl.ty.clone(),
            optional: decl.optional,
            default: decl.default.clone(),
            confirms: None,
            compute: decl.compute.clone(),
        });
    }

    if websocket_count > 1 {
        return Err(RouteConfigError::MultipleWebSocketParams {
            method: method.to_string(),
        });
    }

    for (index, decl) in decls.iter().enumerate() {
        let Some(target_name) = &decl.confirms else {
            continue;
        };
        let target = decls
            .iter()
            .position(|d| &d.name == target_name)
            .ok_or_else(|| RouteConfigError::UnknownConfirmationTarget {
                method: method.to_string(),
                param: decl.name.clone(),
                target: target_name.clone(),
            })?;
        if target == index {
            return Err(RouteConfigError::SelfConfirmation {
                method: method.to_string(),
                param: decl.name.clone(),
            });
        }
        if decls[target].optional != decl.optional {
            return Err(RouteConfigError::ConfirmationOptionalityMismatch {
                method: method.to_string(),
                param: decl.name.clone(),
                target: target_name.clone(),
            });
        }
        specs[index].confirms = Some(target);
    }

    Ok((specs, websocket_count == 1))
}

/// Build the route table for `iface` and register every entry with the
/// external router, using default dispatch hooks.
pub fn register_interface(
    router: &mut dyn Router,
    iface: Arc<dyn WebInterface>,
    style: CaseStyle,
    settings: &WebInterfaceSettings,
) -> Result<Arc<RouteTable>, RouteConfigError> {
    register_interface_with(router, iface, style, settings, DispatchConfig::default())
}

/// [`register_interface`] with explicit dispatch hooks (authentication,
/// authorization, translations, response filters).
pub fn register_interface_with(
    router: &mut dyn Router,
    iface: Arc<dyn WebInterface>,
    style: CaseStyle,
    settings: &WebInterfaceSettings,
    config: DispatchConfig,
) -> Result<Arc<RouteTable>, RouteConfigError> {
    let table = Arc::new(build_route_table(iface.as_ref(), style, settings)?);
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&table), config));

    for (index, entry) in table.entries.iter().enumerate() {
        info!(
            method = %entry.method,
            path = %entry.path,
            source = %entry.source_method,
            websocket = entry.websocket,
            "route registered"
        );
        router.register(RouteBinding {
            method: entry.method.clone(),
            path: entry.path.clone(),
            websocket: entry.websocket,
            handler: Arc::new(BoundRoute {
                dispatcher: Arc::clone(&dispatcher),
                index,
            }),
        });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_collapses_duplicate_slashes() {
        assert_eq!(join_url("/api/", "/users"), "/api/users");
        assert_eq!(join_url("api", "users"), "/api/users");
    }

    #[test]
    fn join_preserves_wildcard_and_trailing_slash() {
        assert_eq!(join_url("/files", "sub/*"), "/files/sub/*");
        assert_eq!(join_url("/a", "b/"), "/a/b/");
    }

    #[test]
    fn root_segment_maps_to_prefix() {
        assert_eq!(join_url("/api", "/"), "/api");
        assert_eq!(join_url("", "/"), "/");
    }

    #[test]
    fn complementary_path_toggles_slash() {
        assert_eq!(complementary_path("/items"), "/items/");
        assert_eq!(complementary_path("/items/"), "/items");
    }
}
