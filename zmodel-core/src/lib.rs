pub mod geometry {
    use std::ops::{Add, Mul, Sub};

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 连续性判断使用的固定容差（模型单位）。
    pub const TOLERANCE: f64 = 0.1;

    /// 二维点，内部以 `glam::DVec2` 表示，序列化为 `[x, y]`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        /// 固定容差的近似相等，按平方距离比较。
        #[inline]
        pub fn almost_equal(self, other: Point2) -> bool {
            self.0.distance_squared(other.0) <= TOLERANCE * TOLERANCE
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    impl Add<Vector2> for Point2 {
        type Output = Point2;

        fn add(self, rhs: Vector2) -> Point2 {
            Point2(self.0 + rhs.0)
        }
    }

    impl Sub for Point2 {
        type Output = Vector2;

        fn sub(self, rhs: Point2) -> Vector2 {
            Vector2(self.0 - rhs.0)
        }
    }

    /// 二维向量，序列化与点相同（`[x, y]`）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn dot(self, other: Vector2) -> f64 {
            self.0.dot(other.0)
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    impl Add for Vector2 {
        type Output = Vector2;

        fn add(self, rhs: Vector2) -> Vector2 {
            Vector2(self.0 + rhs.0)
        }
    }

    impl Sub for Vector2 {
        type Output = Vector2;

        fn sub(self, rhs: Vector2) -> Vector2 {
            Vector2(self.0 - rhs.0)
        }
    }

    impl Mul<f64> for Vector2 {
        type Output = Vector2;

        fn mul(self, rhs: f64) -> Vector2 {
            Vector2(self.0 * rhs)
        }
    }

    /// 角度，弧度制。不做区间归一化，方向与符号由调用方决定。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Angle {
        pub radians: f64,
    }

    impl Angle {
        #[inline]
        pub fn new(radians: f64) -> Self {
            Self { radians }
        }

        #[inline]
        pub fn zero() -> Self {
            Self { radians: 0.0 }
        }

        #[inline]
        pub fn two_pi() -> Self {
            Self {
                radians: std::f64::consts::TAU,
            }
        }
    }

    /// RGBA 颜色，各通道取值 [0, 1]。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Color {
        pub r: f64,
        pub g: f64,
        pub b: f64,
        pub a: f64,
    }

    impl Color {
        #[inline]
        pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
            Self { r, g, b, a }
        }

        #[inline]
        pub fn black() -> Self {
            Self::new(0.0, 0.0, 0.0, 1.0)
        }

        /// 从 0-255 的整数通道构造，不透明。
        #[inline]
        pub fn from_bytes(r: u8, g: u8, b: u8) -> Self {
            Self::new(
                f64::from(r) / 255.0,
                f64::from(g) / 255.0,
                f64::from(b) / 255.0,
                1.0,
            )
        }
    }

    /// 带单位语义的长度，序列化为单键对象（如 `{"Pixels":10.0}`）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub enum Length {
        Pixels(f64),
        Units(f64),
    }

    impl Length {
        #[inline]
        pub fn value(self) -> f64 {
            match self {
                Length::Pixels(v) | Length::Units(v) => v,
            }
        }

        /// 按模型单位制换算为毫米。像素长度没有物理尺寸，返回 `None`。
        pub fn to_millimeters(self, unit: crate::component::UnitSystem) -> Option<f64> {
            match self {
                Length::Pixels(_) => None,
                Length::Units(v) => unit.millimeters_per_unit().map(|factor| v * factor),
            }
        }
    }

    /// 二维仿射变换，六元数组 `[a, b, c, d, e, f]`，序列化为裸数组。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Transform(pub [f64; 6]);

    impl Transform {
        #[inline]
        pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
            Self([a, b, c, d, e, f])
        }

        #[inline]
        pub fn identity() -> Self {
            Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
        }
    }

    impl Default for Transform {
        fn default() -> Self {
            Self::identity()
        }
    }

    /// 轴对齐边界框，点集 min/max 的松散包络。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }

}

pub mod path {
    use serde::de::{self, Deserializer};
    use serde::ser::Serializer;
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::geometry::{Bounds2D, Point2};

    /// 单条路径允许的最大点数。
    pub const MAX_POINTS: usize = 65535;

    #[derive(Debug, Error)]
    pub enum PathError {
        #[error("路径序列损坏：{points} 个点与动词消耗量 {consumed} 不一致")]
        CorruptedSequence { points: usize, consumed: usize },
        #[error("路径序列损坏：Begin 动词出现在位置 {index}")]
        MisplacedBegin { index: usize },
    }

    /// 绘制动词。每个动词消耗固定数量的后续点。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PathVerb {
        Begin,
        LineTo,
        QuadraticTo,
        CubicTo,
    }

    impl PathVerb {
        #[inline]
        pub fn code(self) -> u8 {
            match self {
                PathVerb::Begin => 0,
                PathVerb::LineTo => 1,
                PathVerb::QuadraticTo => 2,
                PathVerb::CubicTo => 3,
            }
        }

        /// 该动词消耗的点数。
        #[inline]
        pub fn consumption(self) -> usize {
            match self {
                PathVerb::Begin | PathVerb::LineTo => 1,
                PathVerb::QuadraticTo => 2,
                PathVerb::CubicTo => 3,
            }
        }
    }

    impl Serialize for PathVerb {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u8(self.code())
        }
    }

    impl<'de> Deserialize<'de> for PathVerb {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            match u8::deserialize(deserializer)? {
                0 => Ok(PathVerb::Begin),
                1 => Ok(PathVerb::LineTo),
                2 => Ok(PathVerb::QuadraticTo),
                3 => Ok(PathVerb::CubicTo),
                other => Err(de::Error::custom(format!("未知的路径动词编码: {other}"))),
            }
        }
    }

    /// 规范化曲线表示：点列 + 动词列 + 闭合标记。
    ///
    /// 不变量：所有动词消耗的点数之和必须等于点列长度，
    /// 由 [`Path::validate`] 在构造完成后显式检查。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Path {
        #[serde(rename = "p")]
        points: Vec<Point2>,
        #[serde(rename = "v")]
        verbs: Vec<PathVerb>,
        #[serde(rename = "c")]
        closed: bool,
    }

    impl Path {
        pub fn new() -> Self {
            Self {
                points: Vec::new(),
                verbs: Vec::new(),
                closed: false,
            }
        }

        #[inline]
        pub fn points(&self) -> &[Point2] {
            &self.points
        }

        #[inline]
        pub fn verbs(&self) -> &[PathVerb] {
            &self.verbs
        }

        #[inline]
        pub fn is_closed(&self) -> bool {
            self.closed
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.points.is_empty()
        }

        /// 点数是否已接近上限（须始终给一个完整的三次段留出空间）。
        #[inline]
        pub fn is_full(&self) -> bool {
            self.points.len() > MAX_POINTS - 3
        }

        /// 最后一个生效的目标点。
        #[inline]
        pub fn last_to(&self) -> Option<Point2> {
            self.points.last().copied()
        }

        pub fn begin_at(&mut self, at: Point2) {
            self.points.push(at);
            self.verbs.push(PathVerb::Begin);
        }

        pub fn line_to(&mut self, to: Point2) {
            self.points.push(to);
            self.verbs.push(PathVerb::LineTo);
        }

        pub fn quadratic_to(&mut self, to: Point2, ctrl: Point2) {
            self.points.push(ctrl);
            self.points.push(to);
            self.verbs.push(PathVerb::QuadraticTo);
        }

        pub fn cubic_to(&mut self, to: Point2, ctrl1: Point2, ctrl2: Point2) {
            self.points.push(ctrl1);
            self.points.push(ctrl2);
            self.points.push(to);
            self.verbs.push(PathVerb::CubicTo);
        }

        pub fn set_closed(&mut self, closed: bool) {
            self.closed = closed;
        }

        /// 将另一条路径续接到当前路径尾部。对方起始的 Begin
        /// 及其点会被跳过：续接的前提是两条路径在容差内相连。
        pub fn append(&mut self, other: &Path) {
            if self.points.is_empty() {
                *self = other.clone();
                return;
            }
            let skip = usize::from(matches!(other.verbs.first(), Some(PathVerb::Begin)));
            self.verbs.extend_from_slice(&other.verbs[skip..]);
            self.points.extend_from_slice(&other.points[skip..]);
        }

        /// 校验点数与动词消耗量是否一致。失败表示规范化器自身
        /// 存在缺陷，属于不可恢复错误。
        pub fn validate(&self) -> Result<(), PathError> {
            let mut consumed = 0usize;
            for (index, verb) in self.verbs.iter().enumerate() {
                if matches!(verb, PathVerb::Begin) && index != 0 {
                    return Err(PathError::MisplacedBegin { index });
                }
                consumed += verb.consumption();
            }
            if consumed != self.points.len() {
                return Err(PathError::CorruptedSequence {
                    points: self.points.len(),
                    consumed,
                });
            }
            Ok(())
        }

        /// 所有点（含控制点）的 min/max 包络。
        pub fn bounding_box(&self) -> Bounds2D {
            let mut bounds = Bounds2D::empty();
            for point in &self.points {
                bounds.include_point(*point);
            }
            bounds
        }
    }

    impl Default for Path {
        fn default() -> Self {
            Self::new()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn verbs_consume_points_exactly() {
            let mut path = Path::new();
            path.begin_at(Point2::new(0.0, 0.0));
            path.line_to(Point2::new(1.0, 1.0));
            path.quadratic_to(Point2::new(3.0, 0.0), Point2::new(2.0, 2.0));
            path.cubic_to(
                Point2::new(6.0, 0.0),
                Point2::new(4.0, 1.0),
                Point2::new(5.0, -1.0),
            );
            assert_eq!(path.points().len(), 7);
            assert!(path.validate().is_ok());
        }

        #[test]
        fn validate_rejects_mismatched_counts() {
            let mut path = Path::new();
            path.begin_at(Point2::new(0.0, 0.0));
            path.line_to(Point2::new(1.0, 0.0));
            path.quadratic_to(Point2::new(2.0, 0.0), Point2::new(1.5, 1.0));
            // 手工破坏点列以模拟规范化器缺陷。
            let mut broken = path.clone();
            broken.points.pop();
            assert!(matches!(
                broken.validate(),
                Err(PathError::CorruptedSequence { points: 3, consumed: 4 })
            ));
        }

        #[test]
        fn validate_rejects_interior_begin() {
            let mut path = Path::new();
            path.begin_at(Point2::new(0.0, 0.0));
            path.begin_at(Point2::new(5.0, 5.0));
            assert!(matches!(
                path.validate(),
                Err(PathError::MisplacedBegin { index: 1 })
            ));
        }

        #[test]
        fn append_skips_redundant_begin() {
            let mut first = Path::new();
            first.begin_at(Point2::new(0.0, 0.0));
            first.line_to(Point2::new(1.0, 0.0));

            let mut second = Path::new();
            second.begin_at(Point2::new(1.0, 0.0));
            second.line_to(Point2::new(2.0, 0.0));

            first.append(&second);
            assert_eq!(first.points().len(), 3);
            assert_eq!(
                first.verbs(),
                &[PathVerb::Begin, PathVerb::LineTo, PathVerb::LineTo]
            );
            assert!(first.validate().is_ok());
        }

        #[test]
        fn bounding_box_covers_control_points() {
            let mut path = Path::new();
            path.begin_at(Point2::new(0.0, 0.0));
            path.cubic_to(
                Point2::new(1.0, 0.0),
                Point2::new(0.2, 5.0),
                Point2::new(0.8, -2.0),
            );
            let bounds = path.bounding_box();
            assert_eq!(bounds.min(), Point2::new(0.0, -2.0));
            assert_eq!(bounds.max(), Point2::new(1.0, 5.0));
        }
    }
}

pub mod component {
    use serde::ser::{SerializeStruct, Serializer};
    use serde::Serialize;
    use thiserror::Error;

    use crate::geometry::{Angle, Bounds2D, Color, Length, Point2, Transform, Vector2};
    use crate::path::Path;

    #[derive(Debug, Error)]
    pub enum ComponentError {
        #[error("组件值序列化失败: {0}")]
        Serialize(#[from] serde_json::Error),
    }

    /// 组件类型编码，持久化时写入 `"t"` 字段。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(u16)]
    pub enum ComponentType {
        Path = 5,
        Bbox = 8,
        Category = 9,
        Hidden = 11,
        Arc = 13,
        Text = 14,
        Name = 16,
        RenderBuffer = 17,
        Layer = 22,
        LayerId = 23,
        ModelSettings = 27,
        Transform = 32,
        Locked = 33,
        Group = 34,
        GroupId = 35,
        Tag = 38,
        StyleId = 39,
        StrokeStyle = 40,
        FillStyle = 41,
        Builtin = 45,
        Block = 47,
        BlockId = 48,
        BlockInstance = 49,
    }

    impl ComponentType {
        #[inline]
        pub fn code(self) -> u16 {
            self as u16
        }
    }

    /// 元素分类编码。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Category {
        Path,
        Text,
        Arc,
        Layer,
        Group,
        Block,
        BlockInstance,
    }

    impl Category {
        #[inline]
        pub fn code(self) -> u16 {
            match self {
                Category::Path => 2,
                Category::Text => 25,
                Category::Arc => 26,
                Category::Layer => 31,
                Category::Group => 38,
                Category::Block => 45,
                Category::BlockInstance => 46,
            }
        }
    }

    impl Serialize for Category {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u16(self.code())
        }
    }

    /// 文本锚点。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Anchor {
        TopLeft,
        TopMiddle,
        TopRight,
        MiddleLeft,
        Middle,
        MiddleRight,
        BottomLeft,
        BottomMiddle,
        BottomRight,
    }

    impl Anchor {
        #[inline]
        pub fn code(self) -> u8 {
            match self {
                Anchor::TopLeft => 0,
                Anchor::TopMiddle => 1,
                Anchor::TopRight => 2,
                Anchor::MiddleLeft => 3,
                Anchor::Middle => 4,
                Anchor::MiddleRight => 5,
                Anchor::BottomLeft => 6,
                Anchor::BottomMiddle => 7,
                Anchor::BottomRight => 8,
            }
        }
    }

    impl Serialize for Anchor {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u8(self.code())
        }
    }

    /// 描边虚线样式。来源线型暂不映射，导入统一取实线。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StrokePattern {
        Solid,
        TouchingDots,
        VeryDenseDots,
        DenseDots,
        LooseDots,
        DenseDashes,
        LooseDashes,
        LongDashes,
        LongDashesDots,
    }

    impl StrokePattern {
        #[inline]
        pub fn code(self) -> u8 {
            match self {
                StrokePattern::Solid => 0,
                StrokePattern::TouchingDots => 1,
                StrokePattern::VeryDenseDots => 2,
                StrokePattern::DenseDots => 15,
                StrokePattern::LooseDots => 16,
                StrokePattern::DenseDashes => 17,
                StrokePattern::LooseDashes => 18,
                StrokePattern::LongDashes => 19,
                StrokePattern::LongDashesDots => 20,
            }
        }
    }

    impl Serialize for StrokePattern {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u8(self.code())
        }
    }

    /// 模型单位制，字节编码。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum UnitSystem {
        None,
        Microns,
        Millimeters,
        Centimeters,
        Meters,
        Kilometers,
        Microinches,
        Mils,
        Inches,
        Feet,
        Miles,
        Yards,
        Unset,
    }

    impl UnitSystem {
        #[inline]
        pub fn code(self) -> u8 {
            match self {
                UnitSystem::None => 0,
                UnitSystem::Microns => 1,
                UnitSystem::Millimeters => 2,
                UnitSystem::Centimeters => 3,
                UnitSystem::Meters => 4,
                UnitSystem::Kilometers => 5,
                UnitSystem::Microinches => 6,
                UnitSystem::Mils => 7,
                UnitSystem::Inches => 8,
                UnitSystem::Feet => 9,
                UnitSystem::Miles => 10,
                UnitSystem::Yards => 19,
                UnitSystem::Unset => 255,
            }
        }

        /// 每单位对应的毫米数。
        pub fn millimeters_per_unit(self) -> Option<f64> {
            match self {
                UnitSystem::Microns => Some(0.001),
                UnitSystem::Millimeters => Some(1.0),
                UnitSystem::Centimeters => Some(10.0),
                UnitSystem::Meters => Some(1000.0),
                UnitSystem::Kilometers => Some(1_000_000.0),
                UnitSystem::Microinches => Some(2.54e-5),
                UnitSystem::Mils => Some(0.0254),
                UnitSystem::Inches => Some(25.4),
                UnitSystem::Feet => Some(304.8),
                UnitSystem::Miles => Some(1_609_344.0),
                UnitSystem::Yards => Some(914.4),
                UnitSystem::None | UnitSystem::Unset => None,
            }
        }
    }

    impl Serialize for UnitSystem {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u8(self.code())
        }
    }

    /// 圆弧/椭圆弧。`radii.x == radii.y` 时退化为圆。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub struct ArcValue {
        #[serde(rename = "c")]
        pub center: Point2,
        #[serde(rename = "r")]
        pub radii: Vector2,
        #[serde(rename = "st_a")]
        pub start_angle: Angle,
        #[serde(rename = "sw_a")]
        pub sweep_angle: Angle,
        #[serde(rename = "x_rot")]
        pub x_rotation: Angle,
    }

    impl ArcValue {
        pub fn new(
            center: Point2,
            radii: Vector2,
            start_angle: Angle,
            sweep_angle: Angle,
            x_rotation: Angle,
        ) -> Self {
            Self {
                center,
                radii,
                start_angle,
                sweep_angle,
                x_rotation,
            }
        }

        /// 整圆：起始角 0，扫掠 2π。
        pub fn circle(center: Point2, radius: f64) -> Self {
            Self::new(
                center,
                Vector2::new(radius, radius),
                Angle::zero(),
                Angle::two_pi(),
                Angle::zero(),
            )
        }

        /// 中心 ± 半径的粗包络。
        pub fn bounding_box(&self) -> Bounds2D {
            let mut bounds = Bounds2D::empty();
            bounds.include_point(self.center + self.radii * -1.0);
            bounds.include_point(self.center + self.radii);
            bounds
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub struct BboxValue {
        #[serde(rename = "a")]
        pub min: Point2,
        #[serde(rename = "b")]
        pub max: Point2,
        #[serde(rename = "r")]
        pub rigid: bool,
    }

    impl BboxValue {
        pub fn from_bounds(bounds: &Bounds2D) -> Self {
            Self {
                min: bounds.min(),
                max: bounds.max(),
                rigid: false,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct NameValue {
        #[serde(rename = "n")]
        pub name: String,
    }

    impl NameValue {
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub struct CategoryValue {
        #[serde(rename = "c")]
        pub category: Category,
    }

    impl CategoryValue {
        pub fn new(category: Category) -> Self {
            Self { category }
        }
    }

    /// 图层属性。仅出现在图层元素上。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub struct LayerValue {
        #[serde(rename = "i")]
        pub internal: bool,
        #[serde(rename = "c")]
        pub color: Color,
    }

    /// 图层关联。图层元素自身携带 z 序、无句柄；
    /// 普通元素携带句柄、无 z 序。
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct LayerIdValue {
        #[serde(rename = "z")]
        pub z_index: Option<u32>,
        #[serde(rename = "h")]
        pub handle: Option<String>,
    }

    impl LayerIdValue {
        pub fn for_layer(z_index: u32) -> Self {
            Self {
                z_index: Some(z_index),
                handle: None,
            }
        }

        pub fn linked(handle: impl Into<String>) -> Self {
            Self {
                z_index: None,
                handle: Some(handle.into()),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct StyleIdValue {
        #[serde(rename = "h")]
        pub handle: String,
    }

    impl StyleIdValue {
        pub fn new(handle: impl Into<String>) -> Self {
            Self {
                handle: handle.into(),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct GroupIdValue {
        #[serde(rename = "h")]
        pub handle: String,
    }

    impl GroupIdValue {
        pub fn new(handle: impl Into<String>) -> Self {
            Self {
                handle: handle.into(),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct BlockIdValue {
        #[serde(rename = "h")]
        pub handle: String,
    }

    impl BlockIdValue {
        pub fn new(handle: impl Into<String>) -> Self {
            Self {
                handle: handle.into(),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct BlockInstanceValue {
        #[serde(rename = "h")]
        pub handle: String,
    }

    impl BlockInstanceValue {
        pub fn new(handle: impl Into<String>) -> Self {
            Self {
                handle: handle.into(),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct TextValue {
        #[serde(rename = "c")]
        pub content: String,
        #[serde(rename = "h")]
        pub height: Length,
        #[serde(rename = "w")]
        pub width: Length,
        #[serde(rename = "a")]
        pub anchor: Anchor,
        #[serde(rename = "p")]
        pub position: Point2,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct StrokeStyleValue {
        #[serde(rename = "c")]
        pub color: Color,
        #[serde(rename = "s")]
        pub size: Length,
        #[serde(rename = "p")]
        pub pattern: StrokePattern,
    }

    impl StrokeStyleValue {
        pub fn solid(color: Color, size: Length) -> Self {
            Self {
                color,
                size,
                pattern: StrokePattern::Solid,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct FillStyleValue {
        #[serde(rename = "c")]
        pub color: Color,
        #[serde(rename = "t")]
        pub texture: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub struct ModelSettingsValue {
        #[serde(rename = "u")]
        pub unit_system: UnitSystem,
    }

    /// 附着在其他元素上的注记。
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct TagValue {
        #[serde(rename = "h")]
        pub parent: String,
        #[serde(rename = "c")]
        pub content: String,
    }

    /// 无字段标记组件的占位值，序列化为 `{}`。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct Marker {}

    /// 可附着组件值的封闭集合。序列化直接展开变体内容。
    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(untagged)]
    pub enum ComponentValue {
        Path(Path),
        Arc(ArcValue),
        Bbox(BboxValue),
        Category(CategoryValue),
        Name(NameValue),
        Layer(LayerValue),
        LayerId(LayerIdValue),
        StyleId(StyleIdValue),
        GroupId(GroupIdValue),
        BlockId(BlockIdValue),
        BlockInstance(BlockInstanceValue),
        Text(TextValue),
        StrokeStyle(StrokeStyleValue),
        FillStyle(FillStyleValue),
        Transform(Transform),
        ModelSettings(ModelSettingsValue),
        Tag(TagValue),
        Group(Marker),
        Block(Marker),
        Hidden(Marker),
        Locked(Marker),
        Builtin(Marker),
        RenderBuffer(Marker),
    }

    impl ComponentValue {
        pub fn kind(&self) -> ComponentType {
            match self {
                ComponentValue::Path(_) => ComponentType::Path,
                ComponentValue::Arc(_) => ComponentType::Arc,
                ComponentValue::Bbox(_) => ComponentType::Bbox,
                ComponentValue::Category(_) => ComponentType::Category,
                ComponentValue::Name(_) => ComponentType::Name,
                ComponentValue::Layer(_) => ComponentType::Layer,
                ComponentValue::LayerId(_) => ComponentType::LayerId,
                ComponentValue::StyleId(_) => ComponentType::StyleId,
                ComponentValue::GroupId(_) => ComponentType::GroupId,
                ComponentValue::BlockId(_) => ComponentType::BlockId,
                ComponentValue::BlockInstance(_) => ComponentType::BlockInstance,
                ComponentValue::Text(_) => ComponentType::Text,
                ComponentValue::StrokeStyle(_) => ComponentType::StrokeStyle,
                ComponentValue::FillStyle(_) => ComponentType::FillStyle,
                ComponentValue::Transform(_) => ComponentType::Transform,
                ComponentValue::ModelSettings(_) => ComponentType::ModelSettings,
                ComponentValue::Tag(_) => ComponentType::Tag,
                ComponentValue::Group(_) => ComponentType::Group,
                ComponentValue::Block(_) => ComponentType::Block,
                ComponentValue::Hidden(_) => ComponentType::Hidden,
                ComponentValue::Locked(_) => ComponentType::Locked,
                ComponentValue::Builtin(_) => ComponentType::Builtin,
                ComponentValue::RenderBuffer(_) => ComponentType::RenderBuffer,
            }
        }

        /// 引用型组件指向的目标元素句柄。
        pub fn linked_handle(&self) -> Option<String> {
            match self {
                ComponentValue::LayerId(v) => v.handle.clone(),
                ComponentValue::StyleId(v) => Some(v.handle.clone()),
                ComponentValue::GroupId(v) => Some(v.handle.clone()),
                ComponentValue::BlockId(v) => Some(v.handle.clone()),
                ComponentValue::BlockInstance(v) => Some(v.handle.clone()),
                ComponentValue::Tag(v) => Some(v.parent.clone()),
                _ => None,
            }
        }

        /// 生成归属于 `owner` 的组件记录。值的 JSON 在此一次性
        /// 计算并缓存，之后的序列化不再重算。
        pub fn to_component(&self, owner: &str) -> Result<Component, ComponentError> {
            let value = serde_json::to_string(self)?;
            Ok(Component {
                handle: owner.to_string(),
                kind: self.kind(),
                value,
                linked_element: self.linked_handle(),
            })
        }
    }

    /// 已落位的组件记录：归属元素句柄 + 类型编码 + 缓存的值 JSON。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Component {
        handle: String,
        kind: ComponentType,
        value: String,
        linked_element: Option<String>,
    }

    impl Component {
        #[inline]
        pub fn handle(&self) -> &str {
            &self.handle
        }

        #[inline]
        pub fn kind(&self) -> ComponentType {
            self.kind
        }

        #[inline]
        pub fn value_json(&self) -> &str {
            &self.value
        }

        #[inline]
        pub fn linked_element(&self) -> Option<&str> {
            self.linked_element.as_deref()
        }
    }

    impl Serialize for Component {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let fields = if self.linked_element.is_some() { 3 } else { 2 };
            let mut state = serializer.serialize_struct("Component", fields)?;
            state.serialize_field("t", &self.kind.code())?;
            state.serialize_field("v", &self.value)?;
            if let Some(linked) = &self.linked_element {
                state.serialize_field("lh", linked)?;
            }
            state.end()
        }
    }

}

pub mod model {
    use std::collections::HashMap;
    use std::time::SystemTime;

    use serde::ser::{SerializeStruct, Serializer};
    use serde::Serialize;

    use crate::component::{
        ArcValue, BboxValue, Category, CategoryValue, Component, ComponentError, ComponentType,
        ComponentValue, FillStyleValue, LayerIdValue, LayerValue, Marker, ModelSettingsValue,
        NameValue, StrokeStyleValue, StyleIdValue, UnitSystem,
    };
    use crate::geometry::{Color, Length, Transform};
    use crate::path::Path;

    /// 场景图元素：稳定句柄 + 有序组件列表。装配期只追加。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Element {
        handle: String,
        components: Vec<Component>,
    }

    impl Element {
        pub fn new(handle: impl Into<String>) -> Self {
            Self {
                handle: handle.into(),
                components: Vec::new(),
            }
        }

        #[inline]
        pub fn handle(&self) -> &str {
            &self.handle
        }

        #[inline]
        pub fn components(&self) -> &[Component] {
            &self.components
        }

        /// 链式追加一个组件值。
        pub fn with(mut self, value: ComponentValue) -> Result<Self, ComponentError> {
            self.attach(value)?;
            Ok(self)
        }

        pub fn attach(&mut self, value: ComponentValue) -> Result<(), ComponentError> {
            let component = value.to_component(&self.handle)?;
            self.components.push(component);
            Ok(())
        }

        pub fn find(&self, kind: ComponentType) -> Option<&Component> {
            self.components.iter().find(|c| c.kind() == kind)
        }

        /// 指定类型组件所引用的目标句柄。
        pub fn linked_handle(&self, kind: ComponentType) -> Option<&str> {
            self.find(kind).and_then(|c| c.linked_element())
        }

        /// 指定类型组件的缓存值 JSON 是否包含给定片段。
        pub fn value_contains(&self, kind: ComponentType, needle: &str) -> bool {
            self.find(kind)
                .is_some_and(|c| c.value_json().contains(needle))
        }
    }

    impl Serialize for Element {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut state = serializer.serialize_struct("Element", 2)?;
            state.serialize_field("h", &self.handle)?;
            state.serialize_field("c", &self.components)?;
            state.end()
        }
    }

    /// 一次导入产出的场景图。元素按装配顺序保存；
    /// 扁平组件列表是元素列表的派生视图，不单独维护。
    #[derive(Debug)]
    pub struct Model {
        id: String,
        name: String,
        owner: String,
        created_at: SystemTime,
        updated_at: SystemTime,
        unit_system: UnitSystem,
        elements: Vec<Element>,
        index: HashMap<String, usize>,
        next_generated: u64,
    }

    impl Model {
        pub fn new(id: impl Into<String>, name: impl Into<String>, owner: impl Into<String>) -> Self {
            let now = SystemTime::now();
            Self {
                id: id.into(),
                name: name.into(),
                owner: owner.into(),
                created_at: now,
                updated_at: now,
                unit_system: UnitSystem::Unset,
                elements: Vec::new(),
                index: HashMap::new(),
                next_generated: 0,
            }
        }

        #[inline]
        pub fn id(&self) -> &str {
            &self.id
        }

        #[inline]
        pub fn name(&self) -> &str {
            &self.name
        }

        #[inline]
        pub fn owner(&self) -> &str {
            &self.owner
        }

        #[inline]
        pub fn created_at(&self) -> SystemTime {
            self.created_at
        }

        #[inline]
        pub fn updated_at(&self) -> SystemTime {
            self.updated_at
        }

        #[inline]
        pub fn unit_system(&self) -> UnitSystem {
            self.unit_system
        }

        /// 模型内唯一的生成句柄，用于来源侧没有原生 id 的元素。
        pub fn generate_handle(&mut self) -> String {
            self.next_generated += 1;
            format!("gen-{}", self.next_generated)
        }

        pub fn add_element(&mut self, element: Element) {
            self.index
                .insert(element.handle().to_string(), self.elements.len());
            self.elements.push(element);
            self.updated_at = SystemTime::now();
        }

        pub fn element(&self, handle: &str) -> Option<&Element> {
            self.index.get(handle).map(|&i| &self.elements[i])
        }

        pub fn element_mut(&mut self, handle: &str) -> Option<&mut Element> {
            self.updated_at = SystemTime::now();
            self.index.get(handle).map(|&i| &mut self.elements[i])
        }

        #[inline]
        pub fn elements(&self) -> &[Element] {
            &self.elements
        }

        /// 全部组件的扁平视图（导出与校验用）。
        pub fn components(&self) -> impl Iterator<Item = &Component> {
            self.elements.iter().flat_map(|e| e.components().iter())
        }

        pub fn component_count(&self) -> usize {
            self.elements.iter().map(|e| e.components().len()).sum()
        }

        /// 建立设置元素并记录单位制。每个模型只应调用一次。
        pub fn set_settings(&mut self, unit_system: UnitSystem) -> Result<(), ComponentError> {
            self.unit_system = unit_system;
            let handle = self.generate_handle();
            let element = Element::new(handle)
                .with(ComponentValue::ModelSettings(ModelSettingsValue { unit_system }))?;
            self.add_element(element);
            Ok(())
        }
    }

    /// 图层元素：Layer + Name + LayerId(z) + Category + StyleId。
    pub fn layer_element(
        handle: impl Into<String>,
        name: &str,
        color: Color,
        z_index: u32,
        style_handle: &str,
        hidden: bool,
        locked: bool,
    ) -> Result<Element, ComponentError> {
        let mut element = Element::new(handle)
            .with(ComponentValue::Layer(LayerValue {
                internal: false,
                color,
            }))?
            .with(ComponentValue::Name(NameValue::new(name)))?
            .with(ComponentValue::LayerId(LayerIdValue::for_layer(z_index)))?
            .with(ComponentValue::Category(CategoryValue::new(Category::Layer)))?
            .with(ComponentValue::StyleId(StyleIdValue::new(style_handle)))?;
        if hidden {
            element.attach(ComponentValue::Hidden(Marker {}))?;
        }
        if locked {
            element.attach(ComponentValue::Locked(Marker {}))?;
        }
        Ok(element)
    }

    /// 路径元素。空路径产出 `None`，调用方按「无可见几何」跳过。
    pub fn path_element(
        handle: impl Into<String>,
        path: Path,
        name: &str,
        layer_handle: &str,
        style_handle: &str,
    ) -> Result<Option<Element>, ComponentError> {
        if path.is_empty() {
            return Ok(None);
        }
        let bbox = BboxValue::from_bounds(&path.bounding_box());
        let element = Element::new(handle)
            .with(ComponentValue::Path(path))?
            .with(ComponentValue::Category(CategoryValue::new(Category::Path)))?
            .with(ComponentValue::Name(NameValue::new(name)))?
            .with(ComponentValue::RenderBuffer(Marker {}))?
            .with(ComponentValue::Transform(Transform::identity()))?
            .with(ComponentValue::Bbox(bbox))?
            .with(ComponentValue::LayerId(LayerIdValue::linked(layer_handle)))?
            .with(ComponentValue::StyleId(StyleIdValue::new(style_handle)))?;
        Ok(Some(element))
    }

    /// 圆弧元素，组件构成与路径元素对应。
    pub fn arc_element(
        handle: impl Into<String>,
        arc: ArcValue,
        name: &str,
        layer_handle: &str,
        style_handle: &str,
    ) -> Result<Element, ComponentError> {
        let bbox = BboxValue::from_bounds(&arc.bounding_box());
        Element::new(handle)
            .with(ComponentValue::Arc(arc))?
            .with(ComponentValue::Category(CategoryValue::new(Category::Arc)))?
            .with(ComponentValue::Name(NameValue::new(name)))?
            .with(ComponentValue::RenderBuffer(Marker {}))?
            .with(ComponentValue::Transform(Transform::identity()))?
            .with(ComponentValue::Bbox(bbox))?
            .with(ComponentValue::LayerId(LayerIdValue::linked(layer_handle)))?
            .with(ComponentValue::StyleId(StyleIdValue::new(style_handle)))
    }

    /// 描边样式元素：StrokeStyle + Name。
    pub fn stroke_style_element(
        handle: impl Into<String>,
        name: &str,
        color: Color,
        size: Length,
    ) -> Result<Element, ComponentError> {
        Element::new(handle)
            .with(ComponentValue::StrokeStyle(StrokeStyleValue::solid(
                color, size,
            )))?
            .with(ComponentValue::Name(NameValue::new(name)))
    }

    /// 填充样式元素：FillStyle + Name。
    pub fn fill_style_element(
        handle: impl Into<String>,
        name: &str,
        color: Color,
    ) -> Result<Element, ComponentError> {
        Element::new(handle)
            .with(ComponentValue::FillStyle(FillStyleValue {
                color,
                texture: String::new(),
            }))?
            .with(ComponentValue::Name(NameValue::new(name)))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::geometry::Point2;

        fn sample_path() -> Path {
            let mut path = Path::new();
            path.begin_at(Point2::new(0.0, 0.0));
            path.line_to(Point2::new(500.0, 0.0));
            path.line_to(Point2::new(500.0, 500.0));
            path
        }

        #[test]
        fn element_append_and_lookup() {
            let element = Element::new("el-1")
                .with(ComponentValue::Name(NameValue::new("Wall")))
                .unwrap()
                .with(ComponentValue::StyleId(StyleIdValue::new("style-1")))
                .unwrap();
            assert_eq!(element.components().len(), 2);
            assert!(element.find(ComponentType::Name).is_some());
            assert_eq!(element.linked_handle(ComponentType::StyleId), Some("style-1"));
        }

        #[test]
        fn empty_path_yields_no_element() {
            let element = path_element("el-1", Path::new(), "PolyLine", "layer-1", "style-1");
            assert!(element.unwrap().is_none());
        }

        #[test]
        fn path_element_recipe_order() {
            let element = path_element("el-1", sample_path(), "PolyLine", "layer-1", "style-1")
                .unwrap()
                .unwrap();
            let kinds: Vec<ComponentType> =
                element.components().iter().map(|c| c.kind()).collect();
            assert_eq!(
                kinds,
                vec![
                    ComponentType::Path,
                    ComponentType::Category,
                    ComponentType::Name,
                    ComponentType::RenderBuffer,
                    ComponentType::Transform,
                    ComponentType::Bbox,
                    ComponentType::LayerId,
                    ComponentType::StyleId,
                ]
            );
            assert_eq!(element.linked_handle(ComponentType::LayerId), Some("layer-1"));
        }

        #[test]
        fn layer_element_carries_flags() {
            let element =
                layer_element("layer-1", "0", Color::black(), 1, "style-1", true, false).unwrap();
            assert!(element.find(ComponentType::Hidden).is_some());
            assert!(element.find(ComponentType::Locked).is_none());
        }

        #[test]
        fn model_flat_view_matches_elements() {
            let mut model = Model::new("m-1", "图纸", "tester");
            model.set_settings(UnitSystem::Millimeters).unwrap();
            let element = path_element("el-1", sample_path(), "PolyLine", "layer-1", "style-1")
                .unwrap()
                .unwrap();
            model.add_element(element);
            let per_element: usize = model.elements().iter().map(|e| e.components().len()).sum();
            assert_eq!(model.component_count(), per_element);
            assert_eq!(model.components().count(), per_element);
            assert!(model.element("el-1").is_some());
            assert!(model.element("missing").is_none());
        }

        #[test]
        fn generated_handles_are_unique() {
            let mut model = Model::new("m-1", "图纸", "tester");
            let a = model.generate_handle();
            let b = model.generate_handle();
            assert_ne!(a, b);
        }
    }
}
