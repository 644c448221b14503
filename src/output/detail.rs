// 该文件是 FoodCal （食卡） 项目的一部分。
// src/output/detail.rs - 选中食物与详情页数据
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::fmt;

/// 交给详情页的当前选中食物
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFood {
  pub name: String,
  pub calories: f64,
  pub additional_details: String,
}

impl SelectedFood {
  pub fn new(name: impl Into<String>, calories: f64) -> Self {
    let name = name.into();
    let additional_details = format!("More details about {name}.");
    Self {
      name,
      calories,
      additional_details,
    }
  }
}

/// 详情页的三行文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailCard {
  pub food_name: String,
  pub calories: String,
  pub additional_details: String,
}

impl From<Option<&SelectedFood>> for DetailCard {
  fn from(food: Option<&SelectedFood>) -> Self {
    let calories = food.map(|f| f.calories).unwrap_or(0.0);
    DetailCard {
      food_name: food.map(|f| f.name.clone()).unwrap_or_default(),
      calories: format!("Calories: {calories} kcal"),
      additional_details: food
        .map(|f| f.additional_details.clone())
        .unwrap_or_default(),
    }
  }
}

impl fmt::Display for DetailCard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", self.food_name)?;
    writeln!(f, "{}", self.calories)?;
    write!(f, "{}", self.additional_details)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selected_food_generates_details() {
    let food = SelectedFood::new("apple", 52.0);
    assert_eq!(food.additional_details, "More details about apple.");
  }

  #[test]
  fn card_shows_selection() {
    let food = SelectedFood::new("french fries", 312.5);
    let card = DetailCard::from(Some(&food));
    assert_eq!(card.food_name, "french fries");
    assert_eq!(card.calories, "Calories: 312.5 kcal");
    assert_eq!(
      card.to_string(),
      "french fries\nCalories: 312.5 kcal\nMore details about french fries."
    );
  }

  #[test]
  fn empty_card_defaults_to_zero_calories() {
    let card = DetailCard::from(None);
    assert_eq!(card.food_name, "");
    assert_eq!(card.calories, "Calories: 0 kcal");
    assert_eq!(card.additional_details, "");
  }
}
