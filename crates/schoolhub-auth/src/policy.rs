//! Path-based role policy consulted by the gatekeeper

use schoolhub_db::Role;

/// How a policy entry matches a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl PathMatch {
    pub fn exact(s: &str) -> Self {
        PathMatch::Exact(s.to_string())
    }

    pub fn prefix(s: &str) -> Self {
        PathMatch::Prefix(s.to_string())
    }

    pub fn contains(s: &str) -> Self {
        PathMatch::Contains(s.to_string())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatch::Exact(p) => path == p,
            PathMatch::Prefix(p) => path.starts_with(p.as_str()),
            PathMatch::Contains(p) => path.contains(p.as_str()),
        }
    }
}

/// Roles permitted on the paths a matcher selects
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub matcher: PathMatch,
    /// Paths the matcher selects that this rule does not cover
    pub except: Vec<PathMatch>,
    pub roles: Vec<Role>,
}

impl RouteRule {
    pub fn new(matcher: PathMatch, roles: &[Role]) -> Self {
        Self {
            matcher,
            except: Vec::new(),
            roles: roles.to_vec(),
        }
    }

    pub fn except(mut self, matcher: PathMatch) -> Self {
        self.except.push(matcher);
        self
    }

    fn applies_to(&self, path: &str) -> bool {
        self.matcher.matches(path) && !self.except.iter().any(|m| m.matches(path))
    }
}

/// Static table of exempt paths and role rules
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    exempt: Vec<PathMatch>,
    rules: Vec<RouteRule>,
}

impl RoutePolicy {
    /// A policy with no exemptions and no role rules
    pub fn empty() -> Self {
        Self {
            exempt: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// The standard table.
    ///
    /// With `exempt_api` the gate only protects page navigation and API
    /// handlers authenticate on their own.
    pub fn standard(exempt_api: bool) -> Self {
        let mut policy = Self::empty()
            .exempt(PathMatch::exact("/"))
            .exempt(PathMatch::prefix("/login"))
            // Clearing a stale cookie must not need a valid one
            .exempt(PathMatch::exact("/logout"))
            .exempt(PathMatch::prefix("/_next"))
            .exempt(PathMatch::prefix("/static"))
            .exempt(PathMatch::contains("."))
            .exempt(PathMatch::prefix("/health"))
            .exempt(PathMatch::prefix("/metrics"));

        if exempt_api {
            policy = policy.exempt(PathMatch::prefix("/api"));
        }

        policy
            .require(RouteRule::new(
                PathMatch::prefix("/super-admin"),
                &[Role::SuperAdmin],
            ))
            .require(
                RouteRule::new(PathMatch::contains("/admin"), &[Role::SchoolAdmin])
                    .except(PathMatch::prefix("/super-admin")),
            )
    }

    pub fn exempt(mut self, matcher: PathMatch) -> Self {
        self.exempt.push(matcher);
        self
    }

    /// Append a rule. Earlier rules take precedence.
    pub fn require(mut self, rule: RouteRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|m| m.matches(path))
    }

    /// Roles allowed on `path`, or `None` when any valid session will do
    pub fn required_roles(&self, path: &str) -> Option<&[Role]> {
        self.rules
            .iter()
            .find(|rule| rule.applies_to(path))
            .map(|rule| rule.roles.as_slice())
    }

    pub fn permits(&self, path: &str, role: Role) -> bool {
        self.required_roles(path)
            .is_none_or(|roles| roles.contains(&role))
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::standard(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_paths() {
        let policy = RoutePolicy::default();
        for path in [
            "/",
            "/login",
            "/login/student",
            "/login/student/forgot-password",
            "/loginx",
            "/_next/static/chunk.js",
            "/static/logo.png",
            "/favicon.ico",
            "/api/auth/login",
            "/api/schools",
            "/health",
            "/healthz",
            "/metrics",
            "/logout",
        ] {
            assert!(policy.is_exempt(path), "{} should be exempt", path);
        }

        for path in ["/super-admin", "/s1/admin", "/s1/student", "/logout/x", "/student"] {
            assert!(!policy.is_exempt(path), "{} should be protected", path);
        }
    }

    #[test]
    fn test_api_protected_when_not_exempted() {
        let policy = RoutePolicy::standard(false);
        assert!(!policy.is_exempt("/api/schools"));
        assert!(policy.is_exempt("/login"));
    }

    #[test]
    fn test_super_admin_rule() {
        let policy = RoutePolicy::default();
        assert_eq!(
            policy.required_roles("/super-admin/schools"),
            Some(&[Role::SuperAdmin][..])
        );
        assert!(policy.permits("/super-admin", Role::SuperAdmin));
        for role in [Role::SchoolAdmin, Role::Lecturer, Role::Student, Role::Staff] {
            assert!(!policy.permits("/super-admin", role));
        }
    }

    #[test]
    fn test_school_admin_rule() {
        let policy = RoutePolicy::default();
        assert!(policy.permits("/s1/admin", Role::SchoolAdmin));
        assert!(policy.permits("/s1/admin/users", Role::SchoolAdmin));
        assert!(!policy.permits("/s1/admin", Role::SuperAdmin));
        assert!(!policy.permits("/s1/admin", Role::Student));

        // `/super-admin/admin` falls to the super-admin rule only
        assert!(policy.permits("/super-admin/admin", Role::SuperAdmin));
        assert!(!policy.permits("/super-admin/admin", Role::SchoolAdmin));
    }

    #[test]
    fn test_other_paths_need_no_role() {
        let policy = RoutePolicy::default();
        assert!(policy.required_roles("/s1/student").is_none());
        assert!(policy.required_roles("/s1/lecturer").is_none());
        for role in Role::ALL {
            assert!(policy.permits("/s1/student", role));
        }
    }
}
