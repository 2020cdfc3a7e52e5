//! Recipes, ingredients and dispense parameters.

use serde::{Deserialize, Serialize};

/// Ingredient identifiers used in V2 recipe payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Ingredient {
    Temp = 0,
    Coffee = 1,
    Taste = 2,
    Granulometry = 3,
    Blend = 4,
    InfusionSpeed = 5,
    Preinfusion = 6,
    Crema = 7,
    DueXPer = 8,
    Milk = 9,
    MilkTemp = 10,
    MilkFroth = 11,
    Inversion = 12,
    TheTemp = 13,
    TheProfile = 14,
    HotWater = 15,
    MixVelocity = 16,
    MixDuration = 17,
    DensityMultiBeverage = 18,
    TempMultiBeverage = 19,
    DecalcType = 20,
    TempRisciacquo = 21,
    WaterRisciacquo = 22,
    CleanType = 23,
    Programmable = 24,
    Visible = 25,
    VisibleInProgramming = 26,
    IndexLength = 27,
    Accessory = 28,
}

impl Ingredient {
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Quantities in millilitres need two bytes; everything else fits one.
    pub const fn is_wide(self) -> bool {
        matches!(self, Ingredient::Coffee | Ingredient::Milk | Ingredient::HotWater)
    }

    /// Whether the ingredient may appear in a dispense request.  Flags past
    /// `WaterRisciacquo` describe the recipe, not the cup, except the
    /// accessory selector.
    pub const fn is_dispensable(self) -> bool {
        (self as u8) < Ingredient::CleanType as u8 || matches!(self, Ingredient::Accessory)
    }

    /// Encoded size of the value that follows the id byte.
    pub const fn value_width(self) -> usize {
        if self.is_wide() {
            2
        } else {
            1
        }
    }
}

impl TryFrom<u8> for Ingredient {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        use Ingredient::*;
        const ALL: [Ingredient; 29] = [
            Temp,
            Coffee,
            Taste,
            Granulometry,
            Blend,
            InfusionSpeed,
            Preinfusion,
            Crema,
            DueXPer,
            Milk,
            MilkTemp,
            MilkFroth,
            Inversion,
            TheTemp,
            TheProfile,
            HotWater,
            MixVelocity,
            MixDuration,
            DensityMultiBeverage,
            TempMultiBeverage,
            DecalcType,
            TempRisciacquo,
            WaterRisciacquo,
            CleanType,
            Programmable,
            Visible,
            VisibleInProgramming,
            IndexLength,
            Accessory,
        ];
        ALL.get(usize::from(value)).copied().ok_or(())
    }
}

/// One ingredient of a recipe together with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientValue {
    pub ingredient: Ingredient,
    pub value: u16,
}

impl IngredientValue {
    pub const fn new(ingredient: Ingredient, value: u16) -> Self {
        Self { ingredient, value }
    }

    /// Appends `[id][value]` with the value one or two bytes wide.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.ingredient.id());
        if self.ingredient.is_wide() {
            buf.extend_from_slice(&self.value.to_be_bytes());
        } else {
            buf.push(self.value as u8);
        }
    }
}

/// What the machine should do with a dispense request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TasteType {
    Delete = 0,
    Save = 1,
    Prepare = 2,
    PrepareAndSave = 3,
    SaveInversion = 5,
    PrepareInversion = 6,
    PrepareAndSaveInversion = 7,
}

/// Dispense operation trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperationTrigger {
    DontCare = 0,
    Start = 1,
    StartProgramOrStop = 2,
    NextStep = 3,
    Stop = 4,
    StopProgram = 5,
    ExitProgramOk = 6,
    AdvancedMode = 7,
}

/// Beverage id that stands for "custom mug" on V2 machines; its taste
/// ingredient is only sent when the recipe is being saved.
pub const CUSTOM_MUG_BEVERAGE: u8 = 200;

/// Parameters of a V1 dispense request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseV1 {
    pub beverage_id: u8,
    pub trigger: OperationTrigger,
    pub coffee_qty: u16,
    pub milk_qty: u16,
    pub taste_type: TasteType,
    /// Aroma strength bits, combined with the taste type.
    pub taste_value: u8,
}

/// Parameters of a V2 dispense request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseV2 {
    pub beverage_id: u8,
    pub profile_id: u8,
    pub trigger: OperationTrigger,
    pub ingredients: Vec<IngredientValue>,
    pub taste_type: TasteType,
    /// Store the ingredients as the profile's default for this beverage.
    pub save: bool,
}

impl DispenseV2 {
    /// Ingredients that are actually put on the wire.
    pub fn wire_ingredients(&self) -> impl Iterator<Item = &IngredientValue> {
        let skip_taste = !self.save && self.beverage_id == CUSTOM_MUG_BEVERAGE;
        self.ingredients.iter().filter(move |iv| {
            iv.ingredient.is_dispensable() && !(skip_taste && iv.ingredient == Ingredient::Taste)
        })
    }
}

/// V2 recipe answer: one beverage and its ingredient values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeData {
    pub profile_id: u8,
    pub beverage_id: u8,
    pub ingredients: Vec<IngredientValue>,
}

impl RecipeData {
    pub fn value_of(&self, ingredient: Ingredient) -> Option<u16> {
        self.ingredients
            .iter()
            .find(|iv| iv.ingredient == ingredient)
            .map(|iv| iv.value)
    }
}

/// V1 recipe answer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeQuantity {
    pub beverage_id: u8,
    pub coffee_qty: u16,
    pub milk_qty: u16,
    /// Upper nibble of the flags byte.
    pub taste: u8,
    pub inversion: bool,
}

/// Display order of beverages for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityList {
    pub profile_id: u8,
    pub beverages: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_try_from_covers_all_ids() {
        for id in 0..=28u8 {
            let ingredient = Ingredient::try_from(id).expect("known id");
            assert_eq!(ingredient.id(), id);
        }
        assert_eq!(Ingredient::try_from(29), Err(()));
    }

    #[test]
    fn test_wide_ingredients() {
        assert!(Ingredient::Coffee.is_wide());
        assert!(Ingredient::Milk.is_wide());
        assert!(Ingredient::HotWater.is_wide());
        assert!(!Ingredient::Taste.is_wide());
        assert_eq!(Ingredient::Temp.value_width(), 1);
    }

    #[test]
    fn test_dispensable_ingredients() {
        assert!(Ingredient::WaterRisciacquo.is_dispensable());
        assert!(!Ingredient::CleanType.is_dispensable());
        assert!(!Ingredient::Visible.is_dispensable());
        assert!(Ingredient::Accessory.is_dispensable());
    }

    #[test]
    fn test_encode_into_uses_value_width() {
        let mut buf = Vec::new();

        IngredientValue::new(Ingredient::Coffee, 40).encode_into(&mut buf);
        IngredientValue::new(Ingredient::Taste, 3).encode_into(&mut buf);

        assert_eq!(buf, vec![0x01, 0x00, 0x28, 0x02, 0x03]);
    }

    #[test]
    fn test_custom_mug_skips_taste_unless_saving() {
        // Arrange
        let mut request = DispenseV2 {
            beverage_id: CUSTOM_MUG_BEVERAGE,
            profile_id: 1,
            trigger: OperationTrigger::Start,
            ingredients: vec![
                IngredientValue::new(Ingredient::Coffee, 100),
                IngredientValue::new(Ingredient::Taste, 2),
                IngredientValue::new(Ingredient::Visible, 1),
            ],
            taste_type: TasteType::Prepare,
            save: false,
        };

        // Act
        let preparing: Vec<Ingredient> = request.wire_ingredients().map(|iv| iv.ingredient).collect();
        request.save = true;
        let saving: Vec<Ingredient> = request.wire_ingredients().map(|iv| iv.ingredient).collect();

        // Assert
        assert_eq!(preparing, vec![Ingredient::Coffee]);
        assert_eq!(saving, vec![Ingredient::Coffee, Ingredient::Taste]);
    }

    #[test]
    fn test_recipe_value_of() {
        let recipe = RecipeData {
            profile_id: 1,
            beverage_id: 7,
            ingredients: vec![IngredientValue::new(Ingredient::Milk, 120)],
        };
        assert_eq!(recipe.value_of(Ingredient::Milk), Some(120));
        assert_eq!(recipe.value_of(Ingredient::Coffee), None);
    }
}
