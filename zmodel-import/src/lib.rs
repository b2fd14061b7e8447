pub mod source {
    use glam::DVec2;

    /// 实体记录属性：稳定句柄、图层引用、颜色/线型/线宽。
    /// 颜色与线型的「随层」哨兵显式建模。
    #[derive(Debug, Clone)]
    pub struct EntityRecord {
        pub handle: String,
        pub layer: String,
        pub color: ColorRef,
        pub linetype: LinetypeRef,
        pub lineweight: i32,
    }

    impl EntityRecord {
        /// 默认随层、线宽取哨兵负值。
        pub fn new(handle: impl Into<String>, layer: impl Into<String>) -> Self {
            Self {
                handle: handle.into(),
                layer: layer.into(),
                color: ColorRef::ByLayer,
                linetype: LinetypeRef::ByLayer,
                lineweight: -1,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ColorRef {
        ByLayer,
        ByBlock,
        Index(u8),
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LinetypeRef {
        ByLayer,
        Named(String),
    }

    /// 折线顶点：坐标 + 凸度。凸度非零表示与下一顶点之间为圆弧段。
    #[derive(Debug, Clone, Copy)]
    pub struct SourceVertex {
        pub position: DVec2,
        pub bulge: f64,
    }

    impl SourceVertex {
        pub fn new(x: f64, y: f64) -> Self {
            Self {
                position: DVec2::new(x, y),
                bulge: 0.0,
            }
        }

        pub fn with_bulge(x: f64, y: f64, bulge: f64) -> Self {
            Self {
                position: DVec2::new(x, y),
                bulge,
            }
        }
    }

    /// 填充边界环的边。弧线边是已知缺口，出现即整体跳过该填充。
    #[derive(Debug, Clone, Copy)]
    pub enum HatchEdge {
        Line { start: DVec2, end: DVec2 },
        Arc,
    }

    /// 来源文档支持的实体种类，在遍历边界一次性判定，
    /// 后续全部走模式匹配分发。
    #[derive(Debug, Clone)]
    pub enum SourceEntity {
        Line {
            record: EntityRecord,
            start: DVec2,
            end: DVec2,
        },
        /// 带凸度的原生折线。
        Polyline {
            record: EntityRecord,
            vertices: Vec<SourceVertex>,
            closed: bool,
        },
        /// 纯顶点 2D 折线，不含弧段。
        VertexPolyline {
            record: EntityRecord,
            vertices: Vec<DVec2>,
            closed: bool,
        },
        Circle {
            record: EntityRecord,
            center: DVec2,
            radius: f64,
        },
        Arc {
            record: EntityRecord,
            center: DVec2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            normal_z: f64,
        },
        Ellipse {
            record: EntityRecord,
            center: DVec2,
            major_radius: f64,
            minor_radius: f64,
            start_param: f64,
            end_param: f64,
            deriv0: DVec2,
            normal_z: f64,
        },
        /// 样条不做解析转换：工具包按精度折线化后进入凸度折线规则。
        /// `flattened` 为空表示折线化失败。
        Spline {
            record: EntityRecord,
            closed: bool,
            flattened: Vec<SourceVertex>,
        },
        Hatch {
            record: EntityRecord,
            is_normal_style: bool,
            loops: Vec<Vec<HatchEdge>>,
        },
        /// 块引用。
        Insert {
            record: EntityRecord,
            block_handle: String,
            block_name: String,
            transform: [f64; 6],
            extents_min: DVec2,
            extents_max: DVec2,
        },
        Text {
            record: EntityRecord,
            content: String,
            position: DVec2,
            height: f64,
            width: f64,
        },
        Dimension {
            record: EntityRecord,
        },
        MText {
            record: EntityRecord,
        },
    }

    impl SourceEntity {
        pub fn record(&self) -> &EntityRecord {
            match self {
                SourceEntity::Line { record, .. }
                | SourceEntity::Polyline { record, .. }
                | SourceEntity::VertexPolyline { record, .. }
                | SourceEntity::Circle { record, .. }
                | SourceEntity::Arc { record, .. }
                | SourceEntity::Ellipse { record, .. }
                | SourceEntity::Spline { record, .. }
                | SourceEntity::Hatch { record, .. }
                | SourceEntity::Insert { record, .. }
                | SourceEntity::Text { record, .. }
                | SourceEntity::Dimension { record }
                | SourceEntity::MText { record } => record,
            }
        }

        pub fn kind_name(&self) -> &'static str {
            match self {
                SourceEntity::Line { .. } => "Line",
                SourceEntity::Polyline { .. } => "Polyline",
                SourceEntity::VertexPolyline { .. } => "VertexPolyline",
                SourceEntity::Circle { .. } => "Circle",
                SourceEntity::Arc { .. } => "Arc",
                SourceEntity::Ellipse { .. } => "Ellipse",
                SourceEntity::Spline { .. } => "Spline",
                SourceEntity::Hatch { .. } => "Hatch",
                SourceEntity::Insert { .. } => "Insert",
                SourceEntity::Text { .. } => "Text",
                SourceEntity::Dimension { .. } => "Dimension",
                SourceEntity::MText { .. } => "MText",
            }
        }
    }

    /// 图层表记录。
    #[derive(Debug, Clone)]
    pub struct SourceLayer {
        pub handle: String,
        pub name: String,
        pub color_index: u8,
        pub is_off: bool,
        pub is_locked: bool,
    }

    /// 块表记录。模型空间块由适配层标记，其句柄充当
    /// 「无父块」哨兵。
    #[derive(Debug, Clone)]
    pub struct SourceBlock {
        pub handle: String,
        pub name: String,
        pub is_model_space: bool,
        pub extents_min: DVec2,
        pub extents_max: DVec2,
        pub entities: Vec<SourceEntity>,
    }

    /// 命名对象字典中的编组。
    #[derive(Debug, Clone)]
    pub struct SourceGroup {
        pub handle: String,
        pub name: String,
        pub members: Vec<String>,
    }

    /// 来源文档快照：导入核心消费的最小契约。
    /// 工具包适配层负责填充，几何坐标保持来源单位。
    #[derive(Debug, Clone)]
    pub struct SourceDocument {
        pub name: String,
        pub units_code: u8,
        pub layers: Vec<SourceLayer>,
        pub blocks: Vec<SourceBlock>,
        pub groups: Vec<SourceGroup>,
    }
}

pub mod palette {
    use zmodel_core::geometry::Color;

    /// CAD 索引色表（ACI），0 为随块占位，1-255 为实际颜色。
    const ACI_COLORS: [[u8; 3]; 256] = [
        [0, 0, 0],
        [255, 0, 0],
        [255, 255, 0],
        [0, 255, 0],
        [0, 255, 255],
        [0, 0, 255],
        [255, 0, 255],
        [0, 0, 0],
        [65, 65, 65],
        [128, 128, 128],
        [255, 0, 0],
        [255, 170, 170],
        [189, 0, 0],
        [189, 126, 126],
        [129, 0, 0],
        [129, 86, 86],
        [104, 0, 0],
        [104, 69, 69],
        [79, 0, 0],
        [79, 53, 53],
        [255, 63, 0],
        [255, 191, 170],
        [189, 46, 0],
        [189, 141, 126],
        [129, 31, 0],
        [129, 96, 86],
        [104, 25, 0],
        [104, 78, 69],
        [79, 19, 0],
        [79, 59, 53],
        [255, 127, 0],
        [255, 212, 170],
        [189, 94, 0],
        [189, 157, 126],
        [129, 64, 0],
        [129, 107, 86],
        [104, 52, 0],
        [104, 86, 69],
        [79, 39, 0],
        [79, 66, 53],
        [255, 191, 0],
        [255, 234, 170],
        [189, 141, 0],
        [189, 173, 126],
        [129, 96, 0],
        [129, 118, 86],
        [104, 78, 0],
        [104, 95, 69],
        [79, 59, 0],
        [79, 73, 53],
        [255, 255, 0],
        [255, 255, 170],
        [189, 189, 0],
        [189, 189, 126],
        [129, 129, 0],
        [129, 129, 86],
        [104, 104, 0],
        [104, 104, 69],
        [79, 79, 0],
        [79, 79, 53],
        [191, 255, 0],
        [234, 255, 170],
        [141, 189, 0],
        [173, 189, 126],
        [96, 129, 0],
        [118, 129, 86],
        [78, 104, 0],
        [95, 104, 69],
        [59, 79, 0],
        [73, 79, 53],
        [127, 255, 0],
        [212, 255, 170],
        [94, 189, 0],
        [157, 189, 126],
        [64, 129, 0],
        [107, 129, 86],
        [52, 104, 0],
        [86, 104, 69],
        [39, 79, 0],
        [66, 79, 53],
        [63, 255, 0],
        [191, 255, 170],
        [46, 189, 0],
        [141, 189, 126],
        [31, 129, 0],
        [96, 129, 86],
        [25, 104, 0],
        [78, 104, 69],
        [19, 79, 0],
        [59, 79, 53],
        [0, 255, 0],
        [170, 255, 170],
        [0, 189, 0],
        [126, 189, 126],
        [0, 129, 0],
        [86, 129, 86],
        [0, 104, 0],
        [69, 104, 69],
        [0, 79, 0],
        [53, 79, 53],
        [0, 255, 63],
        [170, 255, 191],
        [0, 189, 46],
        [126, 189, 141],
        [0, 129, 31],
        [86, 129, 96],
        [0, 104, 25],
        [69, 104, 78],
        [0, 79, 19],
        [53, 79, 59],
        [0, 255, 127],
        [170, 255, 212],
        [0, 189, 94],
        [126, 189, 157],
        [0, 129, 64],
        [86, 129, 107],
        [0, 104, 52],
        [69, 104, 86],
        [0, 79, 39],
        [53, 79, 66],
        [0, 255, 191],
        [170, 255, 234],
        [0, 189, 141],
        [126, 189, 173],
        [0, 129, 96],
        [86, 129, 118],
        [0, 104, 78],
        [69, 104, 95],
        [0, 79, 59],
        [53, 79, 73],
        [0, 255, 255],
        [170, 255, 255],
        [0, 189, 189],
        [126, 189, 189],
        [0, 129, 129],
        [86, 129, 129],
        [0, 104, 104],
        [69, 104, 104],
        [0, 79, 79],
        [53, 79, 79],
        [0, 191, 255],
        [170, 234, 255],
        [0, 141, 189],
        [126, 173, 189],
        [0, 96, 129],
        [86, 118, 129],
        [0, 78, 104],
        [69, 95, 104],
        [0, 59, 79],
        [53, 73, 79],
        [0, 127, 255],
        [170, 212, 255],
        [0, 94, 189],
        [126, 157, 189],
        [0, 64, 129],
        [86, 107, 129],
        [0, 52, 104],
        [69, 86, 104],
        [0, 39, 79],
        [53, 66, 79],
        [0, 63, 255],
        [170, 191, 255],
        [0, 46, 189],
        [126, 141, 189],
        [0, 31, 129],
        [86, 96, 129],
        [0, 25, 104],
        [69, 78, 104],
        [0, 19, 79],
        [53, 59, 79],
        [0, 0, 255],
        [170, 170, 255],
        [0, 0, 189],
        [126, 126, 189],
        [0, 0, 129],
        [86, 86, 129],
        [0, 0, 104],
        [69, 69, 104],
        [0, 0, 79],
        [53, 53, 79],
        [63, 0, 255],
        [191, 170, 255],
        [46, 0, 189],
        [141, 126, 189],
        [31, 0, 129],
        [96, 86, 129],
        [25, 0, 104],
        [78, 69, 104],
        [19, 0, 79],
        [59, 53, 79],
        [127, 0, 255],
        [212, 170, 255],
        [94, 0, 189],
        [157, 126, 189],
        [64, 0, 129],
        [107, 86, 129],
        [52, 0, 104],
        [86, 69, 104],
        [39, 0, 79],
        [66, 53, 79],
        [191, 0, 255],
        [234, 170, 255],
        [141, 0, 189],
        [173, 126, 189],
        [96, 0, 129],
        [118, 86, 129],
        [78, 0, 104],
        [95, 69, 104],
        [59, 0, 79],
        [73, 53, 79],
        [255, 0, 255],
        [255, 170, 255],
        [189, 0, 189],
        [189, 126, 189],
        [129, 0, 129],
        [129, 86, 129],
        [104, 0, 104],
        [104, 69, 104],
        [79, 0, 79],
        [79, 53, 79],
        [255, 0, 191],
        [255, 170, 234],
        [189, 0, 141],
        [189, 126, 173],
        [129, 0, 96],
        [129, 86, 118],
        [104, 0, 78],
        [104, 69, 95],
        [79, 0, 59],
        [79, 53, 73],
        [255, 0, 127],
        [255, 170, 212],
        [189, 0, 94],
        [189, 126, 157],
        [129, 0, 64],
        [129, 86, 107],
        [104, 0, 52],
        [104, 69, 86],
        [79, 0, 39],
        [79, 53, 66],
        [255, 0, 63],
        [255, 170, 191],
        [189, 0, 46],
        [189, 126, 141],
        [129, 0, 31],
        [129, 86, 96],
        [104, 0, 25],
        [104, 69, 78],
        [79, 0, 19],
        [79, 53, 59],
        [51, 51, 51],
        [80, 80, 80],
        [105, 105, 105],
        [130, 130, 130],
        [190, 190, 190],
        [255, 255, 255],
    ];

    /// 索引色转 RGBA（通道归一到 [0,1]，不透明）。
    pub fn aci_color(index: u8) -> Color {
        let [r, g, b] = ACI_COLORS[index as usize];
        Color::from_bytes(r, g, b)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn well_known_indices() {
            assert_eq!(aci_color(1), Color::from_bytes(255, 0, 0));
            assert_eq!(aci_color(3), Color::from_bytes(0, 255, 0));
            assert_eq!(aci_color(5), Color::from_bytes(0, 0, 255));
            assert_eq!(aci_color(255), Color::from_bytes(255, 255, 255));
        }
    }
}

pub mod convert {
    use std::f64::consts::{FRAC_PI_2, TAU};

    use glam::DVec2;

    use zmodel_core::component::ArcValue;
    use zmodel_core::geometry::{Angle, Point2, Vector2};
    use zmodel_core::path::Path;

    const BULGE_EPS: f64 = 1e-9;

    /// 圆弧段的中间表示：圆心、半径、起始角（与 X 轴夹角）、
    /// 正扫掠量与方向。
    #[derive(Debug, Clone, Copy)]
    pub struct CircArc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub sweep: f64,
        pub clockwise: bool,
    }

    impl CircArc {
        #[inline]
        fn direction(&self) -> f64 {
            if self.clockwise { -1.0 } else { 1.0 }
        }

        /// 从起点出发、沿弧前进 `offset` 弧度处的点。
        pub fn eval(&self, offset: f64) -> Point2 {
            let angle = self.start_angle + self.direction() * offset;
            Point2::new(
                self.center.x() + self.radius * angle.cos(),
                self.center.y() + self.radius * angle.sin(),
            )
        }
    }

    fn rotate(point: DVec2, angle: f64) -> DVec2 {
        DVec2::new(
            point.x * angle.cos() - point.y * angle.sin(),
            point.x * angle.sin() + point.y * angle.cos(),
        )
    }

    /// 单位圆坐标系中的点映射回世界坐标：旋转 → 缩放 → 平移。
    fn from_unit_circle(point: DVec2, radius: f64, center: Point2, rotation: f64) -> Point2 {
        let world = rotate(point, rotation) * radius + center.as_vec2();
        Point2::from_vec(world)
    }

    /// 圆弧细分为三次贝塞尔段。每段扫掠不超过 90°，每段输出
    /// 三个点（控制点 1、控制点 2、段终点），段终点即下一段起点；
    /// 整弧起点由调用方此前的 Begin/LineTo 提供，不重复输出。
    pub fn arc_to_cubic_bezier(arc: &CircArc) -> Vec<Point2> {
        if arc.radius <= f64::EPSILON || arc.sweep <= f64::EPSILON {
            return Vec::new();
        }
        let segments = (arc.sweep / FRAC_PI_2).ceil() as usize;
        let delta = arc.sweep / segments as f64;
        let signed = arc.direction() * delta;
        let k = 4.0 / 3.0 * (signed / 3.0).tan();

        let ctrl1 = DVec2::new(1.0, k);
        let ctrl2 = DVec2::new(
            signed.cos() + k * signed.sin(),
            signed.sin() - k * signed.cos(),
        );

        let mut out = Vec::with_capacity(segments * 3);
        for i in 0..segments {
            // 当前段起点在单位圆坐标系中落在 (1, 0)。
            let frame = arc.start_angle + arc.direction() * delta * i as f64;
            out.push(from_unit_circle(ctrl1, arc.radius, arc.center, frame));
            out.push(from_unit_circle(ctrl2, arc.radius, arc.center, frame));
            out.push(arc.eval(delta * (i as f64 + 1.0)));
        }
        out
    }

    /// 将细分结果按三点一组追加为 CubicTo。
    pub fn append_arc(path: &mut Path, arc: &CircArc) {
        let points = arc_to_cubic_bezier(arc);
        for chunk in points.chunks_exact(3) {
            path.cubic_to(chunk[2], chunk[0], chunk[1]);
        }
    }

    /// 凸度段转圆弧。弦长为零或凸度为零时返回 `None`。
    pub fn circ_arc_from_bulge(start: Point2, end: Point2, bulge: f64) -> Option<CircArc> {
        if bulge.abs() <= BULGE_EPS {
            return None;
        }
        let chord = end - start;
        let chord_len = chord.length();
        if chord_len <= f64::EPSILON {
            return None;
        }

        let theta = 4.0 * bulge.atan();
        let half = theta / 2.0;
        if half.sin().abs() <= BULGE_EPS {
            return None;
        }
        let radius = chord_len / (2.0 * half.sin());

        let midpoint = (start.as_vec2() + end.as_vec2()) * 0.5;
        let perp_left = DVec2::new(-chord.y(), chord.x()) / chord_len;
        // 圆心到弦中点的有向距离；优弧时落到弦的另一侧。
        let apothem = (chord_len / 2.0) / half.tan();
        let center = Point2::from_vec(midpoint + perp_left * apothem);

        let start_dir = start.as_vec2() - center.as_vec2();
        let start_angle = start_dir.y.atan2(start_dir.x);

        Some(CircArc {
            center,
            radius: radius.abs(),
            start_angle,
            sweep: theta.abs(),
            clockwise: bulge < 0.0,
        })
    }

    /// 线段：Begin + LineTo。
    pub fn path_from_line(start: Point2, end: Point2) -> Path {
        let mut path = Path::new();
        path.begin_at(start);
        path.line_to(end);
        path
    }

    /// 带凸度折线。闭合时多走一次回绕迭代（顶点 0 作为末顶点的
    /// 后继），显式重复首点闭环。
    pub fn path_from_bulge_polyline(vertices: &[(Point2, f64)], closed: bool) -> Path {
        let mut path = Path::new();
        if vertices.is_empty() {
            return path;
        }
        let count = if closed {
            vertices.len() + 1
        } else {
            vertices.len()
        };
        for i in 0..count {
            let (point, _) = vertices[i % vertices.len()];
            if i == 0 {
                path.begin_at(point);
                continue;
            }
            let (prev, prev_bulge) = vertices[i - 1];
            if let Some(arc) = circ_arc_from_bulge(prev, point, prev_bulge) {
                append_arc(&mut path, &arc);
            } else {
                path.line_to(point);
            }
        }
        path.set_closed(closed);
        path
    }

    /// 纯顶点折线：Begin + 逐点 LineTo；闭合时补一条回到首点的边。
    pub fn path_from_vertices(points: &[Point2], closed: bool) -> Path {
        let mut path = Path::new();
        let Some((first, rest)) = points.split_first() else {
            return path;
        };
        path.begin_at(*first);
        for point in rest {
            path.line_to(*point);
        }
        if closed {
            path.line_to(*first);
        }
        path.set_closed(closed);
        path
    }

    /// 工具包折线化后的样条：按开放凸度折线处理，
    /// 原样条闭合时再补一条回到首点的边。
    pub fn path_from_spline(vertices: &[(Point2, f64)], spline_closed: bool) -> Path {
        let mut path = path_from_bulge_polyline(vertices, false);
        if spline_closed {
            if let Some(first) = path.points().first().copied() {
                path.line_to(first);
            }
            path.set_closed(true);
        }
        path
    }

    /// 填充外环：闭合的纯 LineTo 路径，显式重复首点。
    pub fn path_from_hatch_loop(points: &[Point2]) -> Path {
        path_from_vertices(points, true)
    }

    /// 原生圆弧的规范化规则：扫掠取正向回绕
    /// `end > start ? end - start : 2π - start + end`；
    /// 法向 z 为负时镜像（起始角取 π - end，扫掠反号）。
    pub fn arc_value_from_arc(
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        normal_z: f64,
    ) -> ArcValue {
        let sweep = if end_angle > start_angle {
            end_angle - start_angle
        } else {
            TAU - start_angle + end_angle
        };
        let (start, sweep) = if normal_z < 0.0 {
            (std::f64::consts::PI - end_angle, -sweep)
        } else {
            (start_angle, sweep)
        };
        ArcValue::new(
            center,
            Vector2::new(radius, radius),
            Angle::new(start),
            Angle::new(sweep),
            Angle::zero(),
        )
    }

    /// 椭圆。参数域覆盖整周时视为闭合（起始 0、扫掠 2π），
    /// 否则与圆弧同一套规范化规则。轴倾角由参数 0 处的一阶导数推出。
    pub fn arc_value_from_ellipse(
        center: Point2,
        major_radius: f64,
        minor_radius: f64,
        start_param: f64,
        end_param: f64,
        deriv0: DVec2,
        normal_z: f64,
    ) -> ArcValue {
        let x_rotation = std::f64::consts::PI - (deriv0.x).atan2(deriv0.y - 1.0);
        let full_turn = (end_param - start_param).abs() >= TAU - 1e-9;
        let base = if full_turn {
            ArcValue::new(
                center,
                Vector2::new(major_radius, minor_radius),
                Angle::zero(),
                Angle::two_pi(),
                Angle::zero(),
            )
        } else {
            let partial = arc_value_from_arc(center, 0.0, start_param, end_param, normal_z);
            ArcValue::new(
                center,
                Vector2::new(major_radius, minor_radius),
                partial.start_angle,
                partial.sweep_angle,
                Angle::zero(),
            )
        };
        ArcValue {
            x_rotation: Angle::new(x_rotation),
            ..base
        }
    }

    /// 连续性链接累加器：连续片段在容差内相接且未达点数上限时
    /// 并入同一条路径，否则刷新为已完成路径并另起新链。
    #[derive(Debug, Default)]
    pub struct PathChain {
        current: Option<Path>,
    }

    impl PathChain {
        pub fn new() -> Self {
            Self { current: None }
        }

        /// 送入一个片段。若发生断链，返回此前累积完成的路径。
        pub fn push(&mut self, fragment: Path) -> Option<Path> {
            if fragment.is_empty() {
                return None;
            }
            let Some(acc) = &mut self.current else {
                self.current = Some(fragment);
                return None;
            };
            let connected = match (acc.last_to(), fragment.points().first()) {
                (Some(last), Some(first)) => last.almost_equal(*first),
                _ => false,
            };
            if !connected || acc.is_full() {
                self.current.replace(fragment)
            } else {
                acc.append(&fragment);
                None
            }
        }

        /// 链接结束，取出最后累积的路径。
        pub fn finish(self) -> Option<Path> {
            self.current
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::{FRAC_PI_2, PI};
        use zmodel_core::path::PathVerb;

        fn quarter_arc() -> CircArc {
            CircArc {
                center: Point2::new(0.0, 0.0),
                radius: 10.0,
                start_angle: 0.0,
                sweep: FRAC_PI_2,
                clockwise: false,
            }
        }

        #[test]
        fn subdivision_count_matches_sweep() {
            assert_eq!(arc_to_cubic_bezier(&quarter_arc()).len(), 3);

            let half = CircArc {
                sweep: PI,
                ..quarter_arc()
            };
            assert_eq!(arc_to_cubic_bezier(&half).len(), 6);

            let full = CircArc {
                sweep: TAU,
                ..quarter_arc()
            };
            assert_eq!(arc_to_cubic_bezier(&full).len(), 12);
        }

        #[test]
        fn quarter_arc_ends_on_axis() {
            let points = arc_to_cubic_bezier(&quarter_arc());
            let end = points[points.len() - 1];
            assert!((end.x() - 0.0).abs() < 1e-9);
            assert!((end.y() - 10.0).abs() < 1e-9);
        }

        #[test]
        fn clockwise_arc_mirrors_direction() {
            let arc = CircArc {
                clockwise: true,
                ..quarter_arc()
            };
            let points = arc_to_cubic_bezier(&arc);
            let end = points[points.len() - 1];
            assert!((end.x() - 0.0).abs() < 1e-9);
            assert!((end.y() + 10.0).abs() < 1e-9);
        }

        #[test]
        fn bulge_one_is_a_semicircle() {
            let arc = circ_arc_from_bulge(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 1.0)
                .expect("valid bulge arc");
            assert!((arc.center.x() - 5.0).abs() < 1e-9);
            assert!(arc.center.y().abs() < 1e-9);
            assert!((arc.radius - 5.0).abs() < 1e-9);
            assert!((arc.sweep - PI).abs() < 1e-9);
            assert!(!arc.clockwise);

            let end = arc.eval(arc.sweep);
            assert!((end.x() - 10.0).abs() < 1e-9);
            assert!(end.y().abs() < 1e-9);
        }

        #[test]
        fn zero_bulge_or_chord_is_rejected() {
            let p = Point2::new(1.0, 1.0);
            assert!(circ_arc_from_bulge(p, Point2::new(2.0, 2.0), 0.0).is_none());
            assert!(circ_arc_from_bulge(p, p, 0.5).is_none());
        }

        #[test]
        fn closed_vertex_polyline_repeats_first_point() {
            let corners = [
                Point2::new(0.0, 0.0),
                Point2::new(500.0, 0.0),
                Point2::new(500.0, 500.0),
                Point2::new(0.0, 500.0),
            ];
            let path = path_from_vertices(&corners, true);
            assert_eq!(path.points().len(), 5);
            assert_eq!(
                path.verbs(),
                &[
                    PathVerb::Begin,
                    PathVerb::LineTo,
                    PathVerb::LineTo,
                    PathVerb::LineTo,
                    PathVerb::LineTo,
                ]
            );
            assert!(path.is_closed());
            assert_eq!(path.points()[4], corners[0]);
            assert!(path.validate().is_ok());
        }

        #[test]
        fn closed_bulge_polyline_takes_extra_wrap_iteration() {
            let vertices = [
                (Point2::new(0.0, 0.0), 0.0),
                (Point2::new(500.0, 0.0), 0.0),
                (Point2::new(500.0, 500.0), 0.0),
                (Point2::new(0.0, 500.0), 0.0),
            ];
            let path = path_from_bulge_polyline(&vertices, true);
            assert_eq!(path.points().len(), 5);
            assert_eq!(path.points()[4], Point2::new(0.0, 0.0));
            assert!(path.is_closed());
            assert!(path.validate().is_ok());
        }

        #[test]
        fn bulge_segment_becomes_cubics() {
            let vertices = [
                (Point2::new(0.0, 0.0), 1.0),
                (Point2::new(10.0, 0.0), 0.0),
            ];
            let path = path_from_bulge_polyline(&vertices, false);
            // 半圆拆成两段 90° 贝塞尔。
            assert_eq!(
                path.verbs(),
                &[PathVerb::Begin, PathVerb::CubicTo, PathVerb::CubicTo]
            );
            assert_eq!(path.points().len(), 7);
            let end = path.last_to().expect("non-empty");
            assert!((end.x() - 10.0).abs() < 1e-9);
            assert!(end.y().abs() < 1e-9);
            assert!(path.validate().is_ok());
        }

        #[test]
        fn spline_close_appends_return_edge() {
            let vertices = [
                (Point2::new(0.0, 0.0), 0.0),
                (Point2::new(10.0, 0.0), 0.0),
                (Point2::new(10.0, 10.0), 0.0),
            ];
            let path = path_from_spline(&vertices, true);
            assert!(path.is_closed());
            assert_eq!(path.points().len(), 4);
            assert_eq!(path.points()[3], Point2::new(0.0, 0.0));
        }

        #[test]
        fn chain_merges_fragments_within_tolerance() {
            let mut chain = PathChain::new();
            let a = path_from_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
            let b = path_from_line(Point2::new(1.05, 0.0), Point2::new(2.0, 0.0));
            assert!(chain.push(a).is_none());
            assert!(chain.push(b).is_none());
            let merged = chain.finish().expect("merged path");
            assert_eq!(merged.points().len(), 3);
            assert!(merged.validate().is_ok());
        }

        #[test]
        fn chain_splits_fragments_beyond_tolerance() {
            let mut chain = PathChain::new();
            let a = path_from_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
            let b = path_from_line(Point2::new(1.5, 0.0), Point2::new(2.0, 0.0));
            assert!(chain.push(a).is_none());
            let flushed = chain.push(b).expect("first path flushed");
            assert_eq!(flushed.points().len(), 2);
            let rest = chain.finish().expect("second path kept");
            assert_eq!(rest.points().len(), 2);
        }

        #[test]
        fn arc_sweep_wraps_across_zero() {
            let arc = arc_value_from_arc(Point2::new(0.0, 0.0), 5.0, 3.0 * FRAC_PI_2, FRAC_PI_2, 1.0);
            assert!((arc.sweep_angle.radians - PI).abs() < 1e-9);
            assert!((arc.start_angle.radians - 3.0 * FRAC_PI_2).abs() < 1e-9);
        }

        #[test]
        fn arc_with_flipped_normal_is_mirrored() {
            let arc = arc_value_from_arc(Point2::new(0.0, 0.0), 5.0, 0.0, FRAC_PI_2, -1.0);
            assert!((arc.start_angle.radians - (PI - FRAC_PI_2)).abs() < 1e-9);
            assert!((arc.sweep_angle.radians + FRAC_PI_2).abs() < 1e-9);
        }

        #[test]
        fn full_ellipse_is_closed_sweep() {
            let arc = arc_value_from_ellipse(
                Point2::new(1.0, 2.0),
                8.0,
                4.0,
                0.0,
                TAU,
                DVec2::new(0.0, 4.0),
                1.0,
            );
            assert_eq!(arc.radii, Vector2::new(8.0, 4.0));
            assert!((arc.sweep_angle.radians - TAU).abs() < 1e-9);
            assert_eq!(arc.start_angle.radians, 0.0);
        }

        #[test]
        fn hatch_loop_path_is_closed() {
            let points = [
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 4.0),
            ];
            let path = path_from_hatch_loop(&points);
            assert!(path.is_closed());
            assert_eq!(path.points().len(), 4);
            assert!(path.validate().is_ok());
        }
    }
}

pub mod import {
    use std::collections::HashMap;

    use glam::DVec2;
    use thiserror::Error;
    use tracing::{debug, warn};

    use zmodel_config::ImportConfig;
    use zmodel_core::component::{
        Anchor, ArcValue, BboxValue, BlockIdValue, BlockInstanceValue, Category, CategoryValue,
        ComponentError, ComponentType, ComponentValue, GroupIdValue, LayerIdValue, Marker,
        NameValue, StyleIdValue, TextValue, UnitSystem,
    };
    use zmodel_core::geometry::{Bounds2D, Color, Length, Point2, Transform, Vector2};
    use zmodel_core::model::{
        arc_element, fill_style_element, layer_element, path_element, stroke_style_element,
        Element, Model,
    };
    use zmodel_core::path::{Path, PathError};

    use crate::convert;
    use crate::palette::aci_color;
    use crate::source::{
        ColorRef, EntityRecord, HatchEdge, LinetypeRef, SourceDocument, SourceEntity, SourceVertex,
    };

    #[derive(Debug, Error)]
    pub enum ImportError {
        #[error("路径规范化失败: {0}")]
        Path(#[from] PathError),
        #[error("组件构建失败: {0}")]
        Component(#[from] ComponentError),
        #[error("源文档缺少模型空间块")]
        MissingModelSpace,
    }

    /// 逐实体可恢复问题的分类。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DiagnosticKind {
        UnsupportedKind,
        DegenerateGeometry,
        SplineFlattenFailed,
        HatchBoundaryGap,
        EmptyPath,
        MissingLayer,
    }

    /// 导入过程中跳过实体时留下的诊断记录。
    #[derive(Debug, Clone)]
    pub struct Diagnostic {
        pub handle: String,
        pub kind: DiagnosticKind,
        pub message: String,
    }

    /// 贯穿规范化与工厂调用的显式上下文，
    /// 取代过程级全局量。
    #[derive(Debug, Clone)]
    pub struct ImportContext {
        pub model_space: String,
        pub default_block_style: String,
        pub unit_factor: f64,
    }

    impl ImportContext {
        /// 来源坐标转模型点，单位系数在此一次性应用。
        #[inline]
        pub fn point(&self, raw: DVec2) -> Point2 {
            Point2::new(raw.x * self.unit_factor, raw.y * self.unit_factor)
        }

        #[inline]
        pub fn vertex(&self, vertex: &SourceVertex) -> (Point2, f64) {
            (self.point(vertex.position), vertex.bulge)
        }

        #[inline]
        pub fn scalar(&self, raw: f64) -> f64 {
            raw * self.unit_factor
        }
    }

    /// 导入编排器。单线程、同步：图层与样式必须在任何实体
    /// 之前完成装配，样式解析依赖进行中的模型。
    pub struct Importer {
        config: ImportConfig,
        diagnostics: Vec<Diagnostic>,
        layer_colors: HashMap<String, Color>,
    }

    impl Importer {
        pub fn new(config: ImportConfig) -> Self {
            Self {
                config,
                diagnostics: Vec::new(),
                layer_colors: HashMap::new(),
            }
        }

        pub fn diagnostics(&self) -> &[Diagnostic] {
            &self.diagnostics
        }

        /// 固定遍历顺序：元数据 → 图层表 → 块表 → 编组字典。
        pub fn import(&mut self, doc: &SourceDocument) -> Result<Model, ImportError> {
            let mut model = Model::new(doc.name.clone(), doc.name.clone(), "importer");
            model.set_settings(map_units(doc.units_code))?;

            self.import_layers(doc, &mut model)?;

            let model_space = doc
                .blocks
                .iter()
                .find(|block| block.is_model_space)
                .map(|block| block.handle.clone())
                .ok_or(ImportError::MissingModelSpace)?;

            let default_block_style = model.generate_handle();
            model.add_element(stroke_style_element(
                default_block_style.clone(),
                "Default_Block_Style",
                Color::black(),
                Length::Pixels(1.0),
            )?);

            let ctx = ImportContext {
                model_space,
                default_block_style,
                unit_factor: self.config.geometry.unit_factor,
            };

            self.import_blocks(doc, &mut model, &ctx)?;
            self.import_groups(doc, &mut model)?;

            debug!(
                elements = model.elements().len(),
                components = model.component_count(),
                skipped = self.diagnostics.len(),
                "导入装配完成"
            );
            Ok(model)
        }

        /// 图层表：每个图层一对 Layer/Style 元素，z 序从 1 递增。
        fn import_layers(
            &mut self,
            doc: &SourceDocument,
            model: &mut Model,
        ) -> Result<(), ImportError> {
            for (index, layer) in doc.layers.iter().enumerate() {
                let z_index = index as u32 + 1;
                let width = Length::Pixels(1.0);
                let style_handle = model.generate_handle();
                model.add_element(stroke_style_element(
                    style_handle.clone(),
                    &format!("Style {}", layer.name),
                    Color::black(),
                    width,
                )?);

                let color = aci_color(layer.color_index);
                self.layer_colors.insert(layer.handle.clone(), color);
                model.add_element(layer_element(
                    layer.handle.clone(),
                    &layer.name,
                    color,
                    z_index,
                    &style_handle,
                    layer.is_off,
                    layer.is_locked,
                )?);
                debug!(layer = %layer.name, z_index, "图层已装配");
            }
            Ok(())
        }

        fn import_blocks(
            &mut self,
            doc: &SourceDocument,
            model: &mut Model,
            ctx: &ImportContext,
        ) -> Result<(), ImportError> {
            for block in &doc.blocks {
                let parent = if block.handle == ctx.model_space {
                    None
                } else {
                    Some(block.handle.as_str())
                };
                if parent.is_some() {
                    let mut bounds = Bounds2D::empty();
                    bounds.include_point(ctx.point(block.extents_min));
                    bounds.include_point(ctx.point(block.extents_max));
                    let element = Element::new(block.handle.clone())
                        .with(ComponentValue::Name(NameValue::new(&block.name)))?
                        .with(ComponentValue::Bbox(BboxValue::from_bounds(&bounds)))?
                        .with(ComponentValue::Category(CategoryValue::new(Category::Block)))?
                        .with(ComponentValue::Block(Marker {}))?;
                    model.add_element(element);
                }
                for entity in &block.entities {
                    self.import_entity(entity, model, ctx, parent)?;
                }
            }
            Ok(())
        }

        /// 实体分发。不支持的种类记诊断后继续，
        /// 路径不变量违例作为致命错误上抛。
        fn import_entity(
            &mut self,
            entity: &SourceEntity,
            model: &mut Model,
            ctx: &ImportContext,
            parent: Option<&str>,
        ) -> Result<(), ImportError> {
            match entity {
                SourceEntity::Line { record, start, end } => {
                    let path = convert::path_from_line(ctx.point(*start), ctx.point(*end));
                    self.add_path_element(model, record, path, "Line", parent)
                }
                SourceEntity::Polyline {
                    record,
                    vertices,
                    closed,
                } => {
                    let converted: Vec<(Point2, f64)> =
                        vertices.iter().map(|v| ctx.vertex(v)).collect();
                    let path = convert::path_from_bulge_polyline(&converted, *closed);
                    self.add_path_element(model, record, path, "PolyLine", parent)
                }
                SourceEntity::VertexPolyline {
                    record,
                    vertices,
                    closed,
                } => {
                    let converted: Vec<Point2> =
                        vertices.iter().map(|v| ctx.point(*v)).collect();
                    let path = convert::path_from_vertices(&converted, *closed);
                    self.add_path_element(model, record, path, "PolyLine", parent)
                }
                SourceEntity::Circle {
                    record,
                    center,
                    radius,
                } => {
                    let arc = ArcValue::circle(ctx.point(*center), ctx.scalar(*radius));
                    self.add_arc_element(model, record, arc, "Circle", parent)
                }
                SourceEntity::Arc {
                    record,
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    normal_z,
                } => {
                    let arc = convert::arc_value_from_arc(
                        ctx.point(*center),
                        ctx.scalar(*radius),
                        *start_angle,
                        *end_angle,
                        *normal_z,
                    );
                    self.add_arc_element(model, record, arc, "Arc", parent)
                }
                SourceEntity::Ellipse {
                    record,
                    center,
                    major_radius,
                    minor_radius,
                    start_param,
                    end_param,
                    deriv0,
                    normal_z,
                } => {
                    let arc = convert::arc_value_from_ellipse(
                        ctx.point(*center),
                        ctx.scalar(*major_radius),
                        ctx.scalar(*minor_radius),
                        *start_param,
                        *end_param,
                        *deriv0,
                        *normal_z,
                    );
                    self.add_arc_element(model, record, arc, "Ellipse", parent)
                }
                SourceEntity::Spline {
                    record,
                    closed,
                    flattened,
                } => {
                    if flattened.is_empty() {
                        self.skip(
                            record,
                            DiagnosticKind::SplineFlattenFailed,
                            "样条折线化失败，实体跳过",
                        );
                        return Ok(());
                    }
                    let converted: Vec<(Point2, f64)> =
                        flattened.iter().map(|v| ctx.vertex(v)).collect();
                    let path = convert::path_from_spline(&converted, *closed);
                    self.add_path_element(model, record, path, "Spline", parent)
                }
                SourceEntity::Hatch {
                    record,
                    is_normal_style,
                    loops,
                } => self.import_hatch(model, ctx, record, *is_normal_style, loops, parent),
                SourceEntity::Insert {
                    record,
                    block_handle,
                    block_name,
                    transform,
                    extents_min,
                    extents_max,
                } => self.import_insert(
                    model,
                    ctx,
                    record,
                    block_handle,
                    block_name,
                    *transform,
                    *extents_min,
                    *extents_max,
                    parent,
                ),
                SourceEntity::Text {
                    record,
                    content,
                    position,
                    height,
                    width,
                } => self.import_text(
                    model,
                    ctx,
                    record,
                    content,
                    *position,
                    *height,
                    *width,
                    parent,
                ),
                SourceEntity::Dimension { record } | SourceEntity::MText { record } => {
                    self.skip(
                        record,
                        DiagnosticKind::UnsupportedKind,
                        &format!("暂不支持的实体类型: {}", entity.kind_name()),
                    );
                    Ok(())
                }
            }
        }

        /// 样式解析：颜色与线型均为随层时复用图层样式元素；
        /// 任一显式覆盖则新建黑色描边样式，线宽按实体线宽推导。
        fn resolve_style(
            &mut self,
            record: &EntityRecord,
            model: &mut Model,
        ) -> Result<Option<String>, ImportError> {
            let inherits = matches!(record.color, ColorRef::ByLayer)
                && matches!(record.linetype, LinetypeRef::ByLayer);
            if inherits {
                let resolved = model
                    .element(&record.layer)
                    .and_then(|layer| layer.linked_handle(ComponentType::StyleId))
                    .map(str::to_string);
                return match resolved {
                    Some(style) => Ok(Some(style)),
                    None => {
                        self.skip(
                            record,
                            DiagnosticKind::MissingLayer,
                            "实体引用的图层不存在，实体跳过",
                        );
                        Ok(None)
                    }
                };
            }

            let width = if record.lineweight < 0 {
                1.0
            } else {
                f64::from(record.lineweight) / 100.0
            };
            let handle = model.generate_handle();
            model.add_element(stroke_style_element(
                handle.clone(),
                "Style",
                Color::black(),
                Length::Pixels(width),
            )?);
            Ok(Some(handle))
        }

        fn add_path_element(
            &mut self,
            model: &mut Model,
            record: &EntityRecord,
            path: Path,
            name: &str,
            parent: Option<&str>,
        ) -> Result<(), ImportError> {
            path.validate()?;
            let Some(style) = self.resolve_style(record, model)? else {
                return Ok(());
            };
            let element = path_element(record.handle.clone(), path, name, &record.layer, &style)?;
            let Some(mut element) = element else {
                self.skip(record, DiagnosticKind::EmptyPath, "实体未产出可见几何");
                return Ok(());
            };
            if let Some(block) = parent {
                element.attach(ComponentValue::BlockId(BlockIdValue::new(block)))?;
            }
            model.add_element(element);
            Ok(())
        }

        fn add_arc_element(
            &mut self,
            model: &mut Model,
            record: &EntityRecord,
            arc: ArcValue,
            name: &str,
            parent: Option<&str>,
        ) -> Result<(), ImportError> {
            let Some(style) = self.resolve_style(record, model)? else {
                return Ok(());
            };
            let mut element =
                arc_element(record.handle.clone(), arc, name, &record.layer, &style)?;
            if let Some(block) = parent {
                element.attach(ComponentValue::BlockId(BlockIdValue::new(block)))?;
            }
            model.add_element(element);
            Ok(())
        }

        /// 填充：仅导入常规样式的外环；环内出现弧线边时整体跳过，
        /// 留下显式缺口诊断而非悄悄画错。
        fn import_hatch(
            &mut self,
            model: &mut Model,
            ctx: &ImportContext,
            record: &EntityRecord,
            is_normal_style: bool,
            loops: &[Vec<HatchEdge>],
            parent: Option<&str>,
        ) -> Result<(), ImportError> {
            if !is_normal_style {
                self.skip(
                    record,
                    DiagnosticKind::UnsupportedKind,
                    "非常规填充样式，实体跳过",
                );
                return Ok(());
            }
            let Some(outer) = loops.first() else {
                self.skip(record, DiagnosticKind::DegenerateGeometry, "填充缺少边界环");
                return Ok(());
            };

            let mut points = Vec::with_capacity(outer.len());
            for edge in outer {
                match edge {
                    HatchEdge::Line { start, .. } => points.push(ctx.point(*start)),
                    HatchEdge::Arc => {
                        self.skip(
                            record,
                            DiagnosticKind::HatchBoundaryGap,
                            "填充边界包含弧线段，暂不支持",
                        );
                        return Ok(());
                    }
                }
            }
            let path = convert::path_from_hatch_loop(&points);
            path.validate()?;
            if path.is_empty() {
                self.skip(record, DiagnosticKind::EmptyPath, "填充边界为空");
                return Ok(());
            }

            let color = match record.color {
                ColorRef::Index(index) => aci_color(index),
                _ => self
                    .layer_colors
                    .get(&record.layer)
                    .copied()
                    .unwrap_or_else(Color::black),
            };
            let fill_handle = model.generate_handle();
            model.add_element(fill_style_element(fill_handle.clone(), "Hatch_Style", color)?);

            let element =
                path_element(record.handle.clone(), path, "Hatch", &record.layer, &fill_handle)?;
            if let Some(mut element) = element {
                if let Some(block) = parent {
                    element.attach(ComponentValue::BlockId(BlockIdValue::new(block)))?;
                }
                model.add_element(element);
            }
            Ok(())
        }

        /// 块引用：实例元素带放置变换、默认块样式与 BlockInstance
        /// 引用，嵌套在非模型空间块内时再附 BlockId。
        fn import_insert(
            &mut self,
            model: &mut Model,
            ctx: &ImportContext,
            record: &EntityRecord,
            block_handle: &str,
            block_name: &str,
            transform: [f64; 6],
            extents_min: DVec2,
            extents_max: DVec2,
            parent: Option<&str>,
        ) -> Result<(), ImportError> {
            let mut bounds = Bounds2D::empty();
            bounds.include_point(ctx.point(extents_min));
            bounds.include_point(ctx.point(extents_max));

            let [a, b, c, d, e, f] = transform;
            let placement = Transform::new(a, b, c, d, ctx.scalar(e), ctx.scalar(f));

            let mut element = Element::new(record.handle.clone())
                .with(ComponentValue::Name(NameValue::new(format!(
                    "{block_name} Instance"
                ))))?
                .with(ComponentValue::Bbox(BboxValue::from_bounds(&bounds)))?
                .with(ComponentValue::Category(CategoryValue::new(
                    Category::BlockInstance,
                )))?
                .with(ComponentValue::LayerId(LayerIdValue::linked(&record.layer)))?
                .with(ComponentValue::StyleId(StyleIdValue::new(
                    &ctx.default_block_style,
                )))?
                .with(ComponentValue::Transform(placement))?
                .with(ComponentValue::BlockInstance(BlockInstanceValue::new(
                    block_handle,
                )))?;
            if let Some(block) = parent {
                element.attach(ComponentValue::BlockId(BlockIdValue::new(block)))?;
            }
            model.add_element(element);
            Ok(())
        }

        /// 单行文本。锚点统一取左上。
        fn import_text(
            &mut self,
            model: &mut Model,
            ctx: &ImportContext,
            record: &EntityRecord,
            content: &str,
            position: DVec2,
            height: f64,
            width: f64,
            parent: Option<&str>,
        ) -> Result<(), ImportError> {
            let position = ctx.point(position);
            let height = ctx.scalar(height);
            let width = ctx.scalar(width);

            let mut bounds = Bounds2D::empty();
            bounds.include_point(position);
            bounds.include_point(position + Vector2::new(width, height));

            let text = TextValue {
                content: content.to_string(),
                height: Length::Units(height),
                width: Length::Units(width),
                anchor: Anchor::TopLeft,
                position,
            };
            let mut element = Element::new(record.handle.clone())
                .with(ComponentValue::Text(text))?
                .with(ComponentValue::Category(CategoryValue::new(Category::Text)))?
                .with(ComponentValue::Name(NameValue::new("Text")))?
                .with(ComponentValue::Bbox(BboxValue::from_bounds(&bounds)))?
                .with(ComponentValue::LayerId(LayerIdValue::linked(&record.layer)))?;
            if let Some(block) = parent {
                element.attach(ComponentValue::BlockId(BlockIdValue::new(block)))?;
            }
            model.add_element(element);
            Ok(())
        }

        /// 编组：每个来源编组一个 Group 元素，
        /// 按句柄找到的成员元素附 GroupId 引用。
        fn import_groups(
            &mut self,
            doc: &SourceDocument,
            model: &mut Model,
        ) -> Result<(), ImportError> {
            for group in &doc.groups {
                let handle = model.generate_handle();
                let name = if group.name.is_empty() {
                    "Group".to_string()
                } else {
                    group.name.clone()
                };
                let element = Element::new(handle.clone())
                    .with(ComponentValue::Group(Marker {}))?
                    .with(ComponentValue::Name(NameValue::new(name)))?
                    .with(ComponentValue::Category(CategoryValue::new(Category::Group)))?
                    .with(ComponentValue::Transform(Transform::identity()))?;
                model.add_element(element);

                for member in &group.members {
                    match model.element_mut(member) {
                        Some(target) => {
                            target.attach(ComponentValue::GroupId(GroupIdValue::new(&handle)))?;
                        }
                        None => {
                            debug!(member = %member, group = %group.handle, "编组成员未找到");
                        }
                    }
                }
            }
            Ok(())
        }

        fn skip(&mut self, record: &EntityRecord, kind: DiagnosticKind, message: &str) {
            warn!(handle = %record.handle, ?kind, "{message}");
            self.diagnostics.push(Diagnostic {
                handle: record.handle.clone(),
                kind,
                message: message.to_string(),
            });
        }
    }

    /// 来源图纸单位码映射到模型单位制，未知取毫米。
    pub fn map_units(code: u8) -> UnitSystem {
        match code {
            1 => UnitSystem::Microns,
            2 => UnitSystem::Millimeters,
            3 => UnitSystem::Centimeters,
            4 => UnitSystem::Meters,
            5 => UnitSystem::Kilometers,
            6 => UnitSystem::Microinches,
            7 => UnitSystem::Mils,
            8 => UnitSystem::Inches,
            9 => UnitSystem::Feet,
            10 => UnitSystem::Miles,
            19 => UnitSystem::Yards,
            _ => UnitSystem::Millimeters,
        }
    }

}

pub mod validate {
    use std::collections::{BTreeSet, HashSet};

    use tracing::warn;

    use zmodel_core::model::Model;

    /// 引用完整性检查结果：悬空引用只报告，不修复。
    #[derive(Debug, Clone)]
    pub struct ValidationReport {
        pub missing: Vec<String>,
    }

    impl ValidationReport {
        #[inline]
        pub fn is_clean(&self) -> bool {
            self.missing.is_empty()
        }

        #[inline]
        pub fn missing_count(&self) -> usize {
            self.missing.len()
        }
    }

    /// 汇总全部元素句柄，比对每个组件的引用句柄，
    /// 找不到目标的引用按字典序列出。
    pub fn check_references(model: &Model) -> ValidationReport {
        let handles: HashSet<&str> = model.elements().iter().map(|e| e.handle()).collect();
        let mut missing: BTreeSet<String> = BTreeSet::new();
        for component in model.components() {
            if let Some(linked) = component.linked_element() {
                if !handles.contains(linked) {
                    missing.insert(linked.to_string());
                }
            }
        }
        if !missing.is_empty() {
            warn!(count = missing.len(), "模型存在悬空引用");
        }
        ValidationReport {
            missing: missing.into_iter().collect(),
        }
    }

}

pub mod export {
    use std::io::Write;

    use zmodel_core::component::Component;
    use zmodel_core::model::Model;

    /// 元素数组的持久化 JSON。
    pub fn to_json(model: &Model) -> Result<String, serde_json::Error> {
        serde_json::to_string(model.elements())
    }

    pub fn write_json<W: Write>(model: &Model, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer(writer, model.elements())
    }

    /// 扁平组件流按批切分，批大小只影响下游写入吞吐。
    pub fn component_batches(model: &Model, batch_size: usize) -> Vec<Vec<&Component>> {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::new();
        let mut current = Vec::new();
        for component in model.components() {
            current.push(component);
            if current.len() == batch_size {
                batches.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use zmodel_core::component::{ComponentValue, NameValue};
        use zmodel_core::model::{Element, Model};

        fn model_with_components(count: usize) -> Model {
            let mut model = Model::new("m", "m", "t");
            let mut element = Element::new("a");
            for i in 0..count {
                element
                    .attach(ComponentValue::Name(NameValue::new(format!("n{i}"))))
                    .unwrap();
            }
            model.add_element(element);
            model
        }

        #[test]
        fn batches_cover_all_components() {
            let model = model_with_components(7);
            let batches = component_batches(&model, 3);
            assert_eq!(batches.len(), 3);
            assert_eq!(batches[0].len(), 3);
            assert_eq!(batches[2].len(), 1);
            let total: usize = batches.iter().map(Vec::len).sum();
            assert_eq!(total, model.component_count());
        }

        #[test]
        fn json_round_trips_as_array() {
            let model = model_with_components(2);
            let text = to_json(&model).unwrap();
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value.as_array().map(Vec::len), Some(1));
        }
    }
}

pub use import::{Diagnostic, DiagnosticKind, ImportContext, ImportError, Importer};
pub use validate::{check_references, ValidationReport};
