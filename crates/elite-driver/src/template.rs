use std::fs;
use std::path::Path;

use elite_utils::{DriverError, DriverResult};

/// The script template this crate ships, with every §6.1 placeholder
/// present exactly once. [`DriverConfig::default`](crate::config::DriverConfig)
/// points at it; callers with a custom robot program pass their own
/// template path instead.
pub const DEFAULT_TEMPLATE: &str = include_str!("../resources/external_control.script.template");

/// Tuning parameters substituted into the `{{SERVO_J_REPLACE}}` token.
#[derive(Clone, Copy, Debug)]
pub struct ServojParams {
    pub time: f64,
    pub lookahead_time: f64,
    pub gain: f64,
}

/// Everything the script template needs substituted, gathered in one
/// place so [`materialize`] is a pure function of (template, params).
#[derive(Clone, Debug)]
pub struct TemplateParams {
    pub server_ip: String,
    pub reverse_port: u16,
    pub trajectory_port: u16,
    pub script_command_port: u16,
    pub servoj: ServojParams,
}

/// Reads the template file at `path`. A missing file is a construction-time
/// failure (spec.md §4.8 item 1).
pub fn load_template(path: &Path) -> DriverResult<String> {
    fs::read_to_string(path).map_err(|source| DriverError::FileOpenFail { path: path.to_owned(), source })
}

/// Substitutes every placeholder token in `template` per spec.md §6.1.
/// Every occurrence of every token is replaced; a residual `{{` after
/// substitution violates spec.md Invariant 5 and is reported as a
/// [`DriverError::SocketFail`]-shaped structural error (there is no
/// dedicated error kind for this in spec.md §7, so it is surfaced in the
/// same family as other construction-time programming errors) rather than
/// silently shipped to the robot.
pub fn materialize(template: &str, params: &TemplateParams) -> DriverResult<String> {
    let servoj = format!("t = {}, lookahead_time = {}, gain={}", params.servoj.time, params.servoj.lookahead_time, params.servoj.gain);

    let replacements: [(&str, String); 11] = [
        ("{{SERVER_IP_REPLACE}}", params.server_ip.clone()),
        ("{{REVERSE_PORT_REPLACE}}", params.reverse_port.to_string()),
        ("{{TRAJECTORY_SERVER_PORT_REPLACE}}", params.trajectory_port.to_string()),
        ("{{SCRIPT_COMMAND_PORT_REPLACE}}", params.script_command_port.to_string()),
        ("{{SERVO_J_REPLACE}}", servoj),
        ("{{POS_ZOOM_RATIO_REPLACE}}", (elite_utils::POS_ZOOM_RATIO as i64).to_string()),
        ("{{TIME_ZOOM_RATIO_REPLACE}}", (elite_utils::TIME_ZOOM_RATIO as i64).to_string()),
        ("{{COMMON_ZOOM_RATIO_REPLACE}}", (elite_utils::COMMON_ZOOM_RATIO as i64).to_string()),
        ("{{REVERSE_DATA_SIZE_REPLACE}}", crate::reverse::FRAME_LEN.to_string()),
        ("{{TRAJECTORY_DATA_SIZE_REPLACE}}", crate::trajectory::FRAME_LEN.to_string()),
        ("{{SCRIPT_COMMAND_DATA_SIZE_REPLACE}}", crate::script_command::FRAME_LEN.to_string()),
    ];

    let mut script = template.to_owned();
    for (token, value) in replacements {
        script = script.replace(token, &value);
    }

    if script.contains("{{") {
        return Err(DriverError::SocketFail(format!("script template has unresolved placeholder(s) after substitution: {}", first_residual_token(&script))));
    }
    Ok(script)
}

fn first_residual_token(script: &str) -> String {
    script.find("{{").map_or_else(String::new, |start| script[start..].chars().take(40).collect())
}

/// Wraps `body` as a single named program definition, the form
/// `send_script` uploads directly over the primary port in headless mode
/// instead of serving the raw template text on request (spec.md §4.8
/// item 5). `body` is expected to be raw top-level statements, not an
/// already-`def`'d function; wrapping an already-defined body here would
/// nest it inside a second, call-less definition and the robot would
/// never run it. No call is appended after `end` — the robot controller
/// invokes the named function by itself once it is uploaded.
pub fn wrap_as_program(name: &str, body: &str) -> String {
    let indented: String = body.lines().map(|line| format!("  {line}\n")).collect();
    format!("def {name}():\n{indented}end\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TemplateParams {
        TemplateParams {
            server_ip: "10.0.0.5".to_owned(),
            reverse_port: 50001,
            trajectory_port: 50003,
            script_command_port: 50004,
            servoj: ServojParams { time: 0.008, lookahead_time: 0.1, gain: 300.0 },
        }
    }

    #[test]
    fn default_template_has_no_residual_placeholders_after_substitution() {
        let script = materialize(DEFAULT_TEMPLATE, &params()).unwrap();
        assert!(!script.contains("{{"));
        assert!(script.contains("10.0.0.5"));
        assert!(script.contains("50001"));
    }

    #[test]
    fn every_placeholder_is_replaced_everywhere_it_occurs() {
        let template = "{{SERVER_IP_REPLACE}} and again {{SERVER_IP_REPLACE}}";
        let script = materialize(template, &params()).unwrap();
        assert_eq!(script, "10.0.0.5 and again 10.0.0.5");
    }

    #[test]
    fn residual_placeholder_is_reported() {
        let script = materialize("unknown token {{NOT_A_REAL_TOKEN}}", &params()).unwrap_err();
        assert!(matches!(script, DriverError::SocketFail(_)));
    }

    #[test]
    fn wrap_as_program_indents_without_appending_a_call() {
        let wrapped = wrap_as_program("externalControl", "line_one()\nline_two()");
        assert_eq!(wrapped, "def externalControl():\n  line_one()\n  line_two()\nend\n");
    }
}
