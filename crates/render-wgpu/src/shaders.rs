/// Lit, instanced unit cubes. Used by both the opaque and the blended pipeline;
/// alpha comes from the instance color.
pub const CUBE_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    fog: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) world_pos: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);
    let world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * world_pos;
    out.world_normal = normalize(world_normal);
    out.color = instance.color;
    out.world_pos = world_pos.xyz;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let sun = normalize(vec3<f32>(-0.4, 1.0, 0.6));
    let ambient = 0.35;
    let diffuse = max(dot(in.world_normal, sun), 0.0);
    let lit = in.color.rgb * (ambient + diffuse * 0.65);

    let dist = distance(in.world_pos, uniforms.eye.xyz);
    let fog = clamp(1.0 - exp(-dist * uniforms.fog.w), 0.0, 1.0);
    return vec4<f32>(mix(lit, uniforms.fog.rgb, fog), in.color.a);
}
"#;

/// Ground lines that fade into the fog with distance.
pub const GROUND_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    fog: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct GroundVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct GroundOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) world_pos: vec3<f32>,
};

@vertex
fn vs_ground(vertex: GroundVertex) -> GroundOutput {
    var out: GroundOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    out.world_pos = vertex.position;
    return out;
}

@fragment
fn fs_ground(in: GroundOutput) -> @location(0) vec4<f32> {
    let dist = distance(in.world_pos, uniforms.eye.xyz);
    let fog = clamp(1.0 - exp(-dist * uniforms.fog.w), 0.0, 1.0);
    return vec4<f32>(mix(in.color.rgb, uniforms.fog.rgb, fog), in.color.a);
}
"#;
