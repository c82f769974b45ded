//! Presentation parameters: pretty-print, envelope, and the JSONP callback.
//!
//! Response shaping itself happens elsewhere; these parsers only resolve the
//! client's wishes and replay them in pagination links, which is why they
//! live next to the other parameter parsers.

use crate::query::QueryCompiler;
use crate::request::RequestContext;

impl QueryCompiler {
    /// The client's pretty-print wish: `None` when the feature is disabled
    /// in configuration or the parameter is absent.
    ///
    /// Any value other than `0`/`false` counts as "yes".
    #[must_use]
    pub fn parse_pretty(&self, req: &RequestContext) -> Option<bool> {
        if !self.config().pretty {
            return None;
        }
        let raw = req.param(&self.config().parameters.pretty)?.trim();
        Some(raw != "0" && raw != "false")
    }

    /// `pretty` / `pretty=0`, or nothing when the wish was never expressed.
    #[must_use]
    pub fn pretty_fragment(&self, req: &RequestContext) -> String {
        let name = &self.config().parameters.pretty;
        match self.parse_pretty(req) {
            Some(true) => name.clone(),
            Some(false) => format!("{name}=0"),
            None => String::new(),
        }
    }

    /// Whether the response should be enveloped: the request parameter when
    /// present, the configured default otherwise.
    #[must_use]
    pub fn parse_envelope(&self, req: &RequestContext) -> bool {
        req.param(&self.config().parameters.envelope).map_or_else(
            || self.config().default_envelope,
            |raw| {
                let raw = raw.trim();
                raw != "false" && raw != "0"
            },
        )
    }

    /// `envelope` / `envelope=0`, emitted only when the client sent the
    /// parameter — the configured default is not a request wish.
    #[must_use]
    pub fn envelope_fragment(&self, req: &RequestContext) -> String {
        let name = &self.config().parameters.envelope;
        if !req.has_param(name) {
            return String::new();
        }
        if self.parse_envelope(req) {
            name.clone()
        } else {
            format!("{name}=0")
        }
    }

    /// Whether JSONP is available: global configuration wins, the route
    /// options decide otherwise.
    #[must_use]
    pub fn jsonp_supported(&self, req: &RequestContext) -> bool {
        self.config()
            .jsonp
            .or(req.options.jsonp)
            .unwrap_or(false)
    }

    /// The requested JSONP callback name, if any.
    #[must_use]
    pub fn parse_jsonp(&self, req: &RequestContext) -> Option<String> {
        let raw = req.param(&self.config().parameters.jsonp)?.trim();
        (!raw.is_empty()).then(|| raw.to_string())
    }

    /// `callback=fn`, only when JSONP is actually supported.
    #[must_use]
    pub fn jsonp_fragment(&self, req: &RequestContext) -> String {
        let name = &self.config().parameters.jsonp;
        match self.parse_jsonp(req) {
            Some(callback) if self.jsonp_supported(req) => format!("{name}={callback}"),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::request::RouteOptions;

    fn req(query: &str) -> RequestContext {
        RequestContext::parse(&format!("http://api.test/users?{query}")).unwrap()
    }

    fn pretty_compiler() -> QueryCompiler {
        QueryCompiler::new(ApiConfig {
            pretty: true,
            ..ApiConfig::default()
        })
    }

    #[test]
    fn test_pretty_requires_the_feature() {
        let disabled = QueryCompiler::new(ApiConfig::default());
        assert_eq!(disabled.parse_pretty(&req("pretty")), None);

        assert_eq!(pretty_compiler().parse_pretty(&req("pretty")), Some(true));
        assert_eq!(pretty_compiler().parse_pretty(&req("pretty=1")), Some(true));
        assert_eq!(pretty_compiler().parse_pretty(&req("pretty=0")), Some(false));
        assert_eq!(pretty_compiler().parse_pretty(&req("pretty=false")), Some(false));
        assert_eq!(pretty_compiler().parse_pretty(&req("")), None);
    }

    #[test]
    fn test_pretty_fragment() {
        assert_eq!(pretty_compiler().pretty_fragment(&req("pretty")), "pretty");
        assert_eq!(pretty_compiler().pretty_fragment(&req("pretty=0")), "pretty=0");
        assert_eq!(pretty_compiler().pretty_fragment(&req("")), "");
    }

    #[test]
    fn test_envelope_parameter_beats_default() {
        let compiler = QueryCompiler::new(ApiConfig {
            default_envelope: true,
            ..ApiConfig::default()
        });
        assert!(compiler.parse_envelope(&req("")));
        assert!(!compiler.parse_envelope(&req("envelope=false")));
        assert!(compiler.parse_envelope(&req("envelope")));
    }

    #[test]
    fn test_envelope_fragment_only_replays_the_request() {
        let compiler = QueryCompiler::new(ApiConfig {
            default_envelope: true,
            ..ApiConfig::default()
        });
        // The default is active but the client never asked
        assert_eq!(compiler.envelope_fragment(&req("")), "");
        assert_eq!(compiler.envelope_fragment(&req("envelope")), "envelope");
        assert_eq!(compiler.envelope_fragment(&req("envelope=0")), "envelope=0");
    }

    #[test]
    fn test_jsonp_support_resolution() {
        let compiler = QueryCompiler::new(ApiConfig::default());
        assert!(!compiler.jsonp_supported(&req("")));

        let route_enabled = req("").with_options(RouteOptions {
            jsonp: Some(true),
            ..RouteOptions::default()
        });
        assert!(compiler.jsonp_supported(&route_enabled));

        // Global configuration wins over the route
        let global_off = QueryCompiler::new(ApiConfig {
            jsonp: Some(false),
            ..ApiConfig::default()
        });
        assert!(!global_off.jsonp_supported(&route_enabled));
    }

    #[test]
    fn test_jsonp_fragment_requires_support() {
        let enabled = QueryCompiler::new(ApiConfig {
            jsonp: Some(true),
            ..ApiConfig::default()
        });
        assert_eq!(enabled.jsonp_fragment(&req("callback=cb")), "callback=cb");

        let disabled = QueryCompiler::new(ApiConfig::default());
        assert_eq!(disabled.jsonp_fragment(&req("callback=cb")), "");
        assert_eq!(enabled.jsonp_fragment(&req("callback=")), "");
    }
}
