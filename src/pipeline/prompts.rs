//! Prompt templates for every stage
//!
//! Templates use `{name}` placeholders filled by [`render`].

use super::state::RequirementCategory;

/// Replaces each `{key}` in `template` with its value
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

pub const ROUTER_PROMPT: &str = r#"MCP is a communication protocol with a fixed format. You supervise an MCP server code generation service.
The service is made of these members, in order:
{members}

The conversation is currently in the "{current_step}" step. Decide whether the latest message is work that should now be handed to "{next_step}".
Answer "true" if the current progress requires "{next_step}".
Answer "false" if the user does not need "{next_step}", or is unhappy with the current result and is trying to correct the previous step.

Whatever the user asks, you can only answer "true" or "false"."#;

pub const ANALYSIS_DECOMPOSE_PROMPT: &str = r#"MCP is a fixed-format communication protocol that lets LLMs call external tools. You are a business analysis assistant: analyse the user's requirement and think it through. The user may ask for an MCP server without mentioning MCP at all.

1. Decide whether the requirement is about database operations (database), browser operations (browser), or something else (other).
2. Break the requirement down into steps that code can execute, naming the object each step operates on (a table, a page element, a URL).
3. Decomposition rules:
   - every step is explicitly executable
   - dependencies between steps are clear
   - every step has concrete inputs and outputs
   - steps are neither too coarse nor too fine
   - when information is missing, infer the user's intent and fill in the details

Example: "open the encyclopedia page most relevant to my question" is a browser requirement:
  1. Build an encyclopedia query prompt
  2. Call the LLM to obtain search keywords
  3. Look up the encyclopedia page URL
  4. Open the encyclopedia page URL"#;

pub const ANALYSIS_REFINE_PROMPT: &str = r#"This is the second analysis step. Starting from the previous breakdown, refine it into concrete executable steps, naming the objects each step touches and the operation it performs.
Do not give the final answer yet. Reason step by step and list anything that still needs clarification.

Check that:
1. every step can be turned into concrete code on its own
2. the order of the steps respects their dependencies
3. every part of the original requirement is covered

Finish with the improved list of steps."#;

pub const ANALYSIS_FINALIZE_PROMPT: &str = r#"This is the final step: combine the previous analysis into one JSON object.

OUTPUT FORMAT:
{"requirement_type": "database|browser|other", "operation_details": ["Step 1", "Step 2"]}

RULES:
1. requirement_type must be exactly one of "database", "browser" or "other"
2. operation_details is an array of natural-language implementation steps, not code
3. if the requirement has nothing to do with MCP servers, output {"requirement_type": "other", "operation_details": null}
4. use double quotes around every key and string value

Return ONLY the JSON object, with no explanation or markdown."#;

/// Reference skeleton every generated server must follow
pub const SERVER_SKELETON: &str = r#"import { Server } from "@modelcontextprotocol/sdk/server/index.js";
import { StdioServerTransport } from "@modelcontextprotocol/sdk/server/stdio.js";
import {
  CallToolRequestSchema,
  ListToolsRequestSchema,
} from "@modelcontextprotocol/sdk/types.js";

const server = new Server(
  {
    name: "example-server",
    version: "0.1.0",
  },
  {
    capabilities: {
      tools: {},
    },
  },
);

server.setRequestHandler(ListToolsRequestSchema, async () => {
  return {
    tools: [],
  };
});

server.setRequestHandler(CallToolRequestSchema, async (request) => {
  throw new Error(`Unknown tool: ${request.params.name}`);
});

async function runServer() {
  const transport = new StdioServerTransport();
  await server.connect(transport);
}

runServer().catch((error) => {
  console.error("Fatal error running server:", error);
  process.exit(1);
});"#;

const GENERATE_COMMON: &str = r#"You write MCP (Model Context Protocol) servers in TypeScript.
The user message is a JSON object with the requirement category, the ordered operations to implement and the original requirement.
Every operation must be exposed as an MCP tool with an input schema.
The server must follow this structure:

{skeleton}

Return ONLY the complete TypeScript source of index.ts, without markdown fences or explanations."#;

const GENERATE_DATABASE: &str = r#"The operations act on a relational database. Open the connection once, use parameterized queries, close the connection on shutdown and return query results as JSON text content."#;

const GENERATE_BROWSER: &str = r#"The operations drive a web browser through puppeteer. Launch the browser lazily, reuse one page across tool calls and return page text or screenshots as tool content."#;

const GENERATE_OTHER: &str = r#"Implement each operation with plain Node.js APIs and return results as text content."#;

/// Generation template for a requirement category
pub fn generation_prompt(category: RequirementCategory) -> String {
    let specific = match category {
        RequirementCategory::Database => GENERATE_DATABASE,
        RequirementCategory::Browser => GENERATE_BROWSER,
        RequirementCategory::Other => GENERATE_OTHER,
    };
    format!(
        "{}\n\n{}",
        render(GENERATE_COMMON, &[("skeleton", SERVER_SKELETON)]),
        specific
    )
}

pub const CHECK_PROMPT: &str = r#"MCP is a fixed-format communication protocol. A basic MCP server looks like this:

{skeleton}

The user message is a JSON object with the requirement and the generated code. Check the code against the MCP server structure:
- baseProtocol: imports and protocol framing
- serverSetup: server construction, capabilities and transport
- handlers: ListTools and CallTool request handlers
- tools: every required operation is declared as a tool with an input schema

Return ONLY this JSON structure:
{"isValid": true, "checkResults": {"baseProtocol": {"passed": true, "issues": []}, "serverSetup": {"passed": true, "issues": []}, "handlers": {"passed": true, "issues": []}, "tools": {"passed": true, "issues": []}}, "summary": {"errors": [], "warnings": []}}

When a check fails set its "passed" to false and describe the problem in its "issues" and in the summary errors or warnings."#;

pub const REVISE_PROMPT: &str = r#"Based on the previous check results:
1. review the failed checks (passed = false), the errors and the warnings
2. change the code to fix every one of them
3. keep everything that already passed

Here is a correct MCP server; follow its format:
{skeleton}

Respond with this JSON structure:
{"analysis": {"issues": ["..."], "requiredChanges": ["..."]}, "improvedCode": "complete corrected code", "changeSummary": ["..."]}"#;

pub const GENERATE_CONTINUATION_PROMPT: &str = "The previous code generation was incomplete. Please continue from where it left off and complete the code. Here's what was generated so far:\n\n{partial}";

pub const REVISE_CONTINUATION_PROMPT: &str = "The previous revision was incomplete. Please continue from where it left off and complete the improved code. Here's what was generated so far:\n\n{partial}";

pub const PACKAGE_PROMPT: &str = r#"You are an expert in Node.js packaging. Write the package.json for this MCP server.

It must:
1. list every dependency the code imports
2. provide build and start scripts
3. carry name, version and description
4. set "type": "module"
5. declare a bin entry pointing at the built server

TypeScript code:
```typescript
{code}
```

Return ONLY the JSON content of package.json."#;

pub const TSCONFIG_PROMPT: &str = r#"You are an expert in TypeScript configuration. Write the tsconfig.json for this MCP server.

It must target Node.js, use ES modules and emit into the "dist" directory.

TypeScript code:
```typescript
{code}
```

Return ONLY the JSON content of tsconfig.json."#;

pub const README_PROMPT: &str = r#"You are an expert technical writer. Write the README.md for this MCP server.

Cover the purpose of the server, installation, configuration for an MCP client, and every tool with its parameters.

TypeScript code:
```typescript
{code}
```

Return ONLY the Markdown content of README.md."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let rendered = render("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(rendered, "x and x then y");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{missing}", &[("a", "x")]), "{missing}");
    }

    #[test]
    fn test_generation_prompt_per_category() {
        let database = generation_prompt(RequirementCategory::Database);
        let browser = generation_prompt(RequirementCategory::Browser);
        let other = generation_prompt(RequirementCategory::Other);

        assert!(database.contains("relational database"));
        assert!(browser.contains("puppeteer"));
        assert!(other.contains("plain Node.js"));
        for prompt in [&database, &browser, &other] {
            assert!(prompt.contains("StdioServerTransport"));
            assert!(!prompt.contains("{skeleton}"));
        }
    }

    #[test]
    fn test_continuation_prompt_carries_partial() {
        let prompt = render(GENERATE_CONTINUATION_PROMPT, &[("partial", "const a = {")]);
        assert!(prompt.ends_with("const a = {"));
    }
}
