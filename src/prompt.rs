//! Prompt construction for story and Q&A requests.
//!
//! Both builders are pure: the output depends only on their arguments and the
//! static era table.

use serde::Serialize;

use crate::era::Era;

const STORY_SYSTEM: &str = "你是一位博学的历史学家和文学家，擅长用生动、沉浸式的语言讲述历史故事。
你的任务是根据用户提供的地点和时代，生成一段引人入胜的历史叙述。

写作要求：
1. 使用第二人称\"你\"来增强沉浸感，让读者仿佛身临其境
2. 描述当时的景象、声音、气味，调动读者的感官
3. 融入真实的历史事件和人物
4. 语言优美，富有文学性，避免干巴巴的历史教科书风格
5. 篇幅控制在 400-600 字
6. 不要使用 emoji 或特殊符号";

const QUESTION_SYSTEM: &str = "你是一位博学的历史学家，擅长用准确、简洁的语言回答关于某地历史的问题。
回答要求：
1. 紧扣用户给出的地点和时代
2. 只使用真实的历史事件和人物，不确定时明确说明
3. 篇幅控制在 200 字以内
4. 不要使用 emoji 或特殊符号";

/// A (system, user) instruction pair for a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Resolve the era name and description to interpolate. Unknown eras keep
/// their raw name but borrow the imperial description.
fn era_context(era: &str) -> (String, &'static str) {
    match Era::lookup(era) {
        Some(known) => (
            known.display_name().to_string(),
            known.descriptor().description,
        ),
        None => (
            era.trim().to_string(),
            Era::Imperial.descriptor().description,
        ),
    }
}

/// Build the story prompt for `location` during `era` (id or display name).
pub fn build_prompt(location: &str, era: &str) -> Prompt {
    let (era_name, era_desc) = era_context(era);

    let user = format!(
        "请为我讲述{location}在{era_name}（{era_desc}）的历史故事。

要求：
1. 以\"你站在{location}的土地上...\"或类似的沉浸式开头
2. 描述当时这片土地上发生的重要历史事件
3. 刻画当时人们的生活场景
4. 如果有著名历史人物与此地相关，请融入叙述
5. 结尾可以是对历史的感慨或与现代的对比

请开始你的历史叙述："
    );

    Prompt {
        system: STORY_SYSTEM.to_string(),
        user,
    }
}

/// Build a Q&A prompt about `location` during `era`.
pub fn build_question_prompt(location: &str, era: &str, question: &str) -> Prompt {
    let (era_name, era_desc) = era_context(era);

    let user = format!(
        "地点：{location}
时代：{era_name}（{era_desc}）

问题：{question}",
        question = question.trim()
    );

    Prompt {
        system: QUESTION_SYSTEM.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_display_name_build_same_prompt() {
        assert_eq!(build_prompt("北京", "imperial"), build_prompt("北京", "帝国时代"));
    }

    #[test]
    fn unknown_era_falls_back_to_imperial_description() {
        let prompt = build_prompt("成都", "三国");
        assert!(prompt.user.contains("成都在三国（"));
        assert!(prompt.user.contains(Era::Imperial.descriptor().description));
    }

    #[test]
    fn user_prompt_interpolates_location_and_era() {
        let prompt = build_prompt("西安", "ancient");
        assert!(prompt.user.starts_with("请为我讲述西安在远古时代"));
        assert!(prompt.user.contains("你站在西安的土地上"));
        assert!(prompt.user.contains(Era::Ancient.descriptor().description));
        assert!(prompt.system.contains("400-600"));
    }

    #[test]
    fn question_prompt_carries_question() {
        let prompt = build_question_prompt("南京", "modern", "  这里发生过什么重大事件？ ");
        assert!(prompt.user.contains("地点：南京"));
        assert!(prompt.user.contains("时代：近代"));
        assert!(prompt.user.ends_with("问题：这里发生过什么重大事件？"));
    }
}
