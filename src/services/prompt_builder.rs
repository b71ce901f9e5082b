//! 提示词构建 - 业务能力层
//!
//! 纯文本拼装，没有副作用也没有错误路径。
//!
//! 参考文本整段放在 system prompt 最前面，所有请求共享同一前缀，
//! 服务端的前缀缓存（Context Caching）可以命中。

use std::fmt::Write as _;
use std::sync::Arc;

use crate::clients::CompletionRequest;
use crate::models::record::{option_letter, Record};

/// 提示词构建器
///
/// system prompt 只在构造时生成一次，之后每个请求共享同一个 `Arc<str>`。
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: Arc<str>,
}

impl PromptBuilder {
    pub fn new(context: &str) -> Self {
        Self {
            system_prompt: Arc::from(build_system_prompt(context)),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// 为单道题构建请求
    pub fn build_request(&self, record: &Record) -> CompletionRequest {
        CompletionRequest {
            system: Arc::clone(&self.system_prompt),
            user: build_user_prompt(record),
        }
    }
}

/// 构建 system prompt（参考文本 + 输出要求）
pub fn build_system_prompt(context: &str) -> String {
    format!(
        r#"你是一位资深的欧盟数据保护法学者，同时长期从事 CIPP/E 考试培训。

下面是《通用数据保护条例》(GDPR) 的完整文本，分析时请以此为准逐字引用：

<reference_text>
{context}
</reference_text>

对于每道 CIPP/E 考题，你需要生成两部分内容。

【legalReference：法条原文】
- 找出与题目最直接相关的条款，一般为 1 到 3 条
- 从上面的参考文本中逐字摘录条文，格式为 "GDPR Article N - 标题\n\n条文正文"
- 多个条款之间用 "\n\n---\n\n" 分隔
- 若题目涉及 GDPR 以外的法源（ECHR、ePrivacy Directive、Convention 108 等），注明来源并给出条文
- 去掉 Markdown 符号（#、* 等），只保留干净的法律文本

【analysis：考点深度解析】
用中文写一篇 800 到 1500 字的解析，使用自然段落，不要使用 Markdown 标题，依次包含四个段落：
1. 考点定位：本题考查的知识点与法律概念，并指出对应的 CIPP/E Domain
   （Domain I: European Context；Domain II: GDPR Principles, Rights, Controllers/Processors, Transfers；
   Domain III: Compliance, Security, Accountability, Internet Technology）
2. 法理深度：引用具体条款与 Recital 编号，说明立法逻辑与背景
3. 判例与场景：引用欧盟法院判例（如 Schrems II、Google Spain、Planet49、Fashion ID）或监管处罚案例，
   没有直接判例时构建一个贴近实务的业务场景
4. 知识图谱：把本题考点与其他 GDPR 主题串联起来

【输出格式】
只输出一个 JSON 对象，不要包含任何其他文字：
{{
  "legalReference": "...",
  "analysis": "..."
}}
"#
    )
}

/// 构建单道题的 user prompt
pub fn build_user_prompt(record: &Record) -> String {
    let mut prompt = String::from("请分析以下 CIPP/E 考试题目：\n");

    if let Some(scenario) = record.scenario_text() {
        let _ = write!(prompt, "\n【背景场景】\n{}\n", scenario);
    }

    let _ = write!(prompt, "\n【题目】{}\n\n【选项】\n", record.question);
    for (i, option) in record.options.iter().enumerate() {
        let letter = option_letter(i).unwrap_or('?');
        let _ = writeln!(prompt, "  {}. {}", letter, option);
    }

    let correct = record.correct_letter().unwrap_or('?');
    let _ = write!(
        prompt,
        "\n【正确答案】{}\n\n【现有解释】{}\n\n",
        correct,
        record.explanation.as_deref().unwrap_or("")
    );
    prompt.push_str("请按照 system prompt 中的要求，输出包含 legalReference 和 analysis 的 JSON 对象。");
    prompt
}
